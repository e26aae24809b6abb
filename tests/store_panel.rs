use std::sync::mpsc;
use std::time::Duration;

use anyhow::Result;
use entity_forms::config::{default_config, TableFormOptions, TableFormService};
use entity_forms::panel::{render_panel, NOT_PROVIDED, SCHEMA_BADGE};
use entity_forms::store::{Entity, EntityStore, Record, StoreEvent};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::Builder::from_default_env().is_test(true).try_init();
}

fn record(value: serde_json::Value) -> Record {
    Record::try_from(value).unwrap()
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
struct Payment {
    id: String,
    order_id: String,
    amount: f64,
}

impl Entity for Payment {
    type Id = String;

    fn id(&self) -> String {
        self.id.clone()
    }
}

#[test]
fn product_detail_from_store_and_config() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let mut service =
        TableFormService::open(TableFormOptions::with_config_path(dir.path().join("forms.yaml")))?;
    let config = service.get_config()?;
    let product = config.model("product").unwrap();

    let mut products = EntityStore::<Record>::new();
    products.set_items(vec![
        record(json!({
            "id": 1,
            "name": "Trail tent",
            "price": 1249.5,
            "stock": 12000,
            "customAttributes": {"brand": "Acme", "materials": ["nylon", "aluminium"]}
        })),
        record(json!({"id": 2, "name": "Lantern", "price": 19.9})),
    ]);
    products.upsert_item(record(json!({
        "id": "2",
        "name": "Lantern",
        "price": 21,
        "brand": "Globex"
    })));

    let tent = render_panel("Product", Some(product.detail_attributes.as_slice()), products.get(1)).unwrap();
    assert_eq!(tent.value_of("Price"), Some("$1,249.50"));
    assert_eq!(tent.value_of("Units in stock"), Some("12,000"));
    assert_eq!(tent.value_of("Brand"), Some("Acme"));
    assert_eq!(tent.value_of("Materials"), Some("nylon, aluminium"));
    assert_eq!(tent.value_of("Description"), Some(NOT_PROVIDED));
    assert_eq!(tent.rows.iter().filter(|r| r.badge == Some(SCHEMA_BADGE)).count(), 2);

    assert_eq!(products.len(), 2);
    let lantern = render_panel("Product", Some(product.detail_attributes.as_slice()), products.get(2)).unwrap();
    assert_eq!(lantern.value_of("Price"), Some("$21.00"));
    assert_eq!(lantern.value_of("Brand"), Some("Globex"));
    Ok(())
}

#[test]
fn typed_entities_share_the_same_store() {
    init_logging();
    let mut payments = EntityStore::<Payment>::new();
    let payment = |id: &str, amount: f64| Payment {
        id: id.to_string(),
        order_id: "o-1".to_string(),
        amount,
    };

    payments.upsert_items(vec![payment("pay-1", 10.0), payment("pay-2", 20.0)]);
    payments.upsert_item(payment("pay-1", 15.0));
    payments.remove_item("pay-2");

    assert_eq!(payments.items(), &[payment("pay-1", 15.0)]);
    assert_eq!(payments.get("pay-1").map(|p| p.amount), Some(15.0));
}

#[test]
fn observers_follow_store_changes() -> Result<()> {
    init_logging();
    let mut bookings = EntityStore::<Record>::new();
    let (seen_tx, seen_rx) = mpsc::channel();
    bookings.observe(move |event| {
        let _ = seen_tx.send(event);
    });

    bookings.upsert_item(record(json!({"id": 10, "guest": "Ada"})));
    bookings.upsert_items(Vec::new());
    bookings.remove_item(10);

    let timeout = Duration::from_secs(5);
    assert_eq!(seen_rx.recv_timeout(timeout)?, StoreEvent::Inserted("10".to_string()));
    assert_eq!(seen_rx.recv_timeout(timeout)?, StoreEvent::Removed("10".to_string()));

    // Dropping the store ends the callback thread and closes the channel.
    drop(bookings);
    assert!(seen_rx.recv_timeout(timeout).is_err());
    Ok(())
}

#[test]
fn default_models_render_without_data() {
    for model in default_config().into_models() {
        let panel = render_panel(&model.label, Some(model.detail_attributes.as_slice()), None).unwrap();
        assert_eq!(panel.rows.len(), model.detail_attributes.len());
        assert!(panel.rows.iter().all(|row| row.value == NOT_PROVIDED));
    }
}
