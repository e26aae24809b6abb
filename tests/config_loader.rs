use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use entity_forms::config::{
    default_config, parse_config, ConfigError, InvalidConfigPolicy, SyncReport, TableFormConfig,
    TableFormOptions, TableFormService, TemplateStatus, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH,
};
use serde_json::json;
use tempfile::TempDir;

fn init_logging() {
    let _ = env_logger::Builder::from_default_env().is_test(true).try_init();
}

fn config_path(dir: &TempDir) -> PathBuf {
    dir.path().join(DEFAULT_CONFIG_PATH)
}

fn service(path: &Path, on_invalid: InvalidConfigPolicy) -> Result<TableFormService> {
    TableFormService::open(TableFormOptions {
        on_invalid,
        ..TableFormOptions::with_config_path(path)
    })
}

fn write(path: &Path, content: &str) -> Result<()> {
    fs::create_dir_all(path.parent().unwrap())?;
    fs::write(path, content)?;
    Ok(())
}

#[test]
fn missing_file_writes_defaults() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let path = config_path(&dir);
    let mut service = service(&path, InvalidConfigPolicy::Fail)?;

    assert!(!service.is_initialized());
    let config = service.initialize()?.clone();

    assert!(service.is_initialized());
    assert!(path.exists());
    assert_eq!(config, default_config());
    let on_disk = parse_config(&fs::read_to_string(&path)?)?;
    assert_eq!(on_disk, default_config());

    let ids: Vec<String> = on_disk.models().iter().map(|m| m.id.clone()).collect();
    assert_eq!(ids, vec!["product", "property", "tour"]);

    let templates = service.db().form_templates()?;
    assert_eq!(templates.len(), 3);
    let tour = service.db().load_form_template("tour-form")?;
    assert_eq!(tour.as_ref(), config.model("tour").and_then(|m| m.form_template.as_ref()));
    Ok(())
}

#[test]
fn json_file_round_trips() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let path = config_path(&dir);
    let content = json!({
        "models": [{
            "id": "booking",
            "label": "Booking",
            "tableColumns": [
                {"key": "guest", "label": "Guest", "sortable": true},
                {"key": "total", "label": "Total", "type": "currency"},
                {"key": "status", "label": "Status", "badge": true}
            ],
            "detailAttributes": [
                {"key": "total", "label": "Total", "source": "base", "format": "currency"},
                {"key": "roomView", "label": "View", "source": "custom", "badge": true,
                 "description": "Requested by the guest"}
            ],
            "formTemplate": {
                "id": "booking-form",
                "title": "Booking",
                "entity": "booking",
                "description": "Manual booking entry",
                "status": "draft",
                "allowedRoles": ["admin", "support"],
                "fields": [{
                    "id": "booking-guest",
                    "name": "guest",
                    "label": "Guest",
                    "type": "text",
                    "required": true,
                    "validation": ["required"],
                    "editableRoles": ["admin"]
                }, {
                    "id": "booking-notes",
                    "name": "notes",
                    "label": "Notes",
                    "type": "textarea",
                    "required": false,
                    "description": "Internal only",
                    "validation": [],
                    "editableRoles": ["admin", "support"]
                }]
            }
        }]
    });
    write(&path, &serde_json::to_string_pretty(&content)?)?;

    let mut service = service(&path, InvalidConfigPolicy::Fail)?;
    let config = service.get_config()?;

    assert_eq!(serde_json::to_value(config)?, content);
    let template = service.db().load_form_template("booking-form")?.unwrap();
    assert_eq!(template.status, TemplateStatus::Draft);
    assert_eq!(template.fields.len(), 2);
    assert_eq!(template.fields[1].description.as_deref(), Some("Internal only"));
    Ok(())
}

#[test]
fn sparse_json_file_is_returned_unchanged() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let path = config_path(&dir);
    let content = json!({
        "models": [{
            "id": "order",
            "label": "Order",
            "tableColumns": [{"key": "total", "label": "Total", "width": 120}],
            "detailAttributes": [{"key": "total", "label": "Total"}],
            "formTemplate": {
                "id": "order-form",
                "title": "Order",
                "entity": "order",
                "fields": [{"id": "order-total", "name": "total", "label": "Total", "type": "currency"}]
            }
        }]
    });
    write(&path, &content.to_string())?;

    let mut service = service(&path, InvalidConfigPolicy::Fail)?;
    let config = service.get_config()?;

    assert_eq!(serde_json::to_value(config)?, content);
    assert_eq!(config.document(), Some(&content));
    let template = service.db().load_form_template("order-form")?.unwrap();
    assert_eq!(template.status, TemplateStatus::Draft);
    assert!(!template.fields[0].required);
    Ok(())
}

#[test]
fn yaml_file_is_loaded() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let path = config_path(&dir);
    write(
        &path,
        "# marketplace models
models:
    - id: order
      label: Order
      tableColumns:
          - key: number
            label: \"Order #\" # quoted, or the # starts a comment
          - key: total
            label: Total
            type: currency
            sortable: true
      detailAttributes:
          - key: giftNote
            label: Gift note
            source: custom
      formTemplate:
          id: order-form
          title: Order
          entity: order
          status: published
          allowedRoles:
              - admin
          fields:
              - id: order-number
                name: number
                label: Order number
                type: text
                required: true
                validation:
                editableRoles:
                    - admin
",
    )?;

    let mut service = service(&path, InvalidConfigPolicy::Fail)?;
    let config = service.initialize()?;
    let order = config.model("order").unwrap();

    assert_eq!(order.table_columns[0].label, "Order #");
    assert_eq!(order.table_columns[1].sortable, Some(true));
    let template = order.form_template.as_ref().unwrap();
    assert!(template.fields[0].validation.is_empty());
    assert_eq!(template.fields[0].editable_roles, vec!["admin"]);

    let document = serde_json::to_value(config)?;
    assert_eq!(document["models"][0]["formTemplate"]["fields"][0]["validation"], serde_json::Value::Null);
    assert!(document["models"][0]["detailAttributes"][0].get("format").is_none());
    Ok(())
}

#[test]
fn initialize_is_idempotent() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let path = config_path(&dir);
    let mut service = service(&path, InvalidConfigPolicy::Fail)?;
    let db_events = service.db().observer();

    let first = service.initialize()?.clone();
    let saved_rows = db_events.try_iter().count();
    assert!(saved_rows > 0);

    // Neither the file nor the database is touched again.
    fs::write(&path, "not: [valid")?;
    let second = service.get_config()?.clone();

    assert_eq!(first, second);
    assert_eq!(db_events.try_iter().count(), 0);
    Ok(())
}

#[test]
fn unparseable_file_fails_with_diagnostic() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let path = config_path(&dir);
    let broken = "models:\n    - id: product\n    label: Product\n";
    write(&path, broken)?;

    let mut service = service(&path, InvalidConfigPolicy::Fail)?;
    let err = service.initialize().unwrap_err();

    match err.downcast_ref::<ConfigError>() {
        Some(ConfigError::Unparseable { yaml, .. }) => assert_eq!(yaml.line(), 3),
        other => panic!("unexpected {:?}", other),
    }
    assert!(format!("{:#}", err).contains("table-form-config.yaml"));
    assert!(!service.is_initialized());
    assert_eq!(fs::read_to_string(&path)?, broken);
    assert!(service.db().form_templates()?.is_empty());
    Ok(())
}

#[test]
fn wrong_shape_fails_with_diagnostic() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let path = config_path(&dir);
    write(&path, r#"{"items": []}"#)?;

    let mut service = service(&path, InvalidConfigPolicy::Fail)?;
    let err = service.initialize().unwrap_err();

    assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::InvalidShape)));
    Ok(())
}

#[test]
fn reset_policy_recovers_from_any_invalid_file() -> Result<()> {
    init_logging();
    for broken in ["models:\n    - a\n    b: c\n", r#"{"items": []}"#, "title: \"open\n"] {
        let dir = TempDir::new()?;
        let path = config_path(&dir);
        write(&path, broken)?;

        let mut service = service(&path, InvalidConfigPolicy::ResetToDefault)?;
        let config = service.initialize()?.clone();

        assert_eq!(config, default_config());
        assert_eq!(parse_config(&fs::read_to_string(&path)?)?, default_config());
    }
    Ok(())
}

#[test]
fn reset_to_defaults_repairs_a_custom_file() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let path = config_path(&dir);
    write(&path, r#"{"models": [{"id": "order", "label": "Order"}]}"#)?;

    let mut service = service(&path, InvalidConfigPolicy::Fail)?;
    assert_eq!(service.initialize()?.models().len(), 1);

    let config = service.reset_to_defaults()?.clone();

    assert_eq!(config, default_config());
    assert_eq!(service.get_config()?, &default_config());
    assert_eq!(parse_config(&fs::read_to_string(&path)?)?, default_config());
    assert_eq!(service.db().form_templates()?.len(), 3);
    Ok(())
}

#[test]
fn sync_inserts_then_updates() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let service = service(&config_path(&dir), InvalidConfigPolicy::Fail)?;
    let config = default_config();
    let field_count: usize = config.form_templates().map(|t| t.fields.len()).sum();

    let first = service.sync_templates(&config)?;
    let second = service.sync_templates(&config)?;

    assert_eq!(
        first,
        SyncReport {
            templates_inserted: 3,
            templates_updated: 0,
            fields_inserted: field_count,
            fields_updated: 0,
        }
    );
    assert_eq!(
        second,
        SyncReport {
            templates_inserted: 0,
            templates_updated: 3,
            fields_inserted: 0,
            fields_updated: field_count,
        }
    );
    Ok(())
}

#[test]
fn sync_updates_changed_definitions() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let service = service(&config_path(&dir), InvalidConfigPolicy::Fail)?;
    service.sync_templates(&default_config())?;

    let mut models = default_config().into_models();
    let template = models[0].form_template.as_mut().unwrap();
    template.title = "Renamed".to_string();
    template.fields[0].required = false;
    let expected = template.clone();
    service.sync_templates(&TableFormConfig::from_models(models))?;

    assert_eq!(service.db().load_form_template(&expected.id)?, Some(expected));
    Ok(())
}

#[test]
fn database_file_keeps_templates() -> Result<()> {
    init_logging();
    let dir = TempDir::new()?;
    let options = TableFormOptions {
        database_path: Some(dir.path().join("forms.db")),
        ..TableFormOptions::with_config_path(config_path(&dir))
    };
    TableFormService::open(options.clone())?.initialize()?;

    let reopened = TableFormService::open(options)?;
    assert!(!reopened.is_initialized());
    assert_eq!(reopened.db().form_templates()?.len(), 3);
    Ok(())
}

#[test]
fn config_path_from_env() {
    std::env::set_var(CONFIG_PATH_ENV, "/etc/marketplace/forms.yaml");
    let options = TableFormOptions::from_env();
    std::env::remove_var(CONFIG_PATH_ENV);

    assert_eq!(options.config_path, PathBuf::from("/etc/marketplace/forms.yaml"));
    assert_eq!(TableFormOptions::from_env().config_path, PathBuf::from(DEFAULT_CONFIG_PATH));
}
