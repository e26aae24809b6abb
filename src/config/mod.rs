pub use defaults::default_config;
pub use model::*;
pub use service::{
    parse_config, ConfigError, InvalidConfigPolicy, SyncReport, TableFormOptions,
    TableFormService, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH,
};

pub mod defaults;
pub mod model;
pub mod service;
pub mod yaml;
