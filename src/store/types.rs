use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Anything that can live in an [`EntityStore`](super::EntityStore).
///
/// Stores compare ids by their string form, so an id of `5` and an id of
/// `"5"` address the same slot.
pub trait Entity: Clone {
    type Id: fmt::Display;

    fn id(&self) -> Self::Id;

    fn store_key(&self) -> String {
        self.id().to_string()
    }
}

/// Id of a dynamic record: the backing data may carry either numbers or
/// strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(id) => write!(f, "{}", id),
            EntityId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId::Int(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId::Text(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        EntityId::Text(id)
    }
}

/// Key under which records keep their schema-less extra fields.
pub const CUSTOM_ATTRIBUTES: &str = "customAttributes";

/// A business object of any type (product, booking, order, ...) held as
/// a JSON object. Only `id` is expected; everything else varies by type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Looks `key` up in the nested `customAttributes` object, if any.
    pub fn custom_attribute(&self, key: &str) -> Option<&Value> {
        self.0
            .get(CUSTOM_ATTRIBUTES)
            .and_then(|v| v.as_object())
            .and_then(|attrs| attrs.get(key))
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl TryFrom<Value> for Record {
    type Error = anyhow::Error;

    fn try_from(value: Value) -> anyhow::Result<Self> {
        match value {
            Value::Object(map) => Ok(Record(map)),
            other => Err(anyhow::anyhow!("Record must be a JSON object, got {}", other)),
        }
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Record(map)
    }
}

impl Entity for Record {
    type Id = EntityId;

    /// Records without an `id` all map to the empty key.
    fn id(&self) -> EntityId {
        match self.0.get("id") {
            Some(Value::Number(n)) => match n.as_i64().or_else(|| integral(n.as_f64()?)) {
                Some(i) => EntityId::Int(i),
                None => EntityId::Text(n.to_string()),
            },
            Some(Value::String(s)) => EntityId::Text(s.clone()),
            Some(Value::Null) | None => EntityId::Text(String::new()),
            Some(other) => EntityId::Text(other.to_string()),
        }
    }
}

/// `5.0` is the id `5`.
fn integral(x: f64) -> Option<i64> {
    let in_range = x >= i64::MIN as f64 && x < i64::MAX as f64;
    (x.fract() == 0.0 && in_range).then_some(x as i64)
}

/// Sent to store observers after every mutation that changed state.
/// Each variant but `Replaced` and `Cleared` carries the store key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    Replaced { len: usize },
    Inserted(String),
    Updated(String),
    Removed(String),
    Cleared,
}
