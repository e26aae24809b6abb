use serde::{de::DeserializeOwned, Serialize};

/// Trait for types that can be stored in the database. The type's name
/// is the table name and its `id` field the primary key.
pub trait DbEntity: Serialize + DeserializeOwned {}

// Blanket implementation for any type that meets the requirements
impl<T> DbEntity for T where T: Serialize + DeserializeOwned {}

/// Sent to subscribers after a transaction commits. Each variant carries
/// the table name and the row id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DbEvent {
    Insert(String, String),
    Update(String, String),
}

impl DbEvent {
    pub fn is_insert(&self) -> bool {
        matches!(self, DbEvent::Insert(..))
    }
}
