pub use entity_store::EntityStore;
pub use types::*;

pub mod entity_store;
pub mod types;
