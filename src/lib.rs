pub mod config;
pub mod db;
pub mod notifier;
pub mod panel;
pub mod store;

pub use config::{TableFormConfig, TableFormOptions, TableFormService};
pub use db::Db;
pub use panel::{render_panel, PanelView};
pub use store::{Entity, EntityStore, Record};
pub use rusqlite;
pub use rusqlite_migration;
