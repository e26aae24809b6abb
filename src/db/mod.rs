// Re-export all public items from the db modules
pub use self::core::Db;
pub use forms::{FormField, FormTemplate};
pub use transaction::DbTransaction;
pub use types::*;

pub mod core;
pub mod forms;
pub mod transaction;
pub mod types;
