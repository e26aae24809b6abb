use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde_json::Value;
use thiserror::Error;

use crate::config::{default_config, yaml, TableFormConfig};
use crate::db::{forms, Db, FormField, FormTemplate};

pub const DEFAULT_CONFIG_PATH: &str = "server/data/table-form-config.yaml";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "TABLE_FORM_CONFIG";

/// What to do with a config file that exists but cannot be used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InvalidConfigPolicy {
    /// Return the diagnostic from `initialize()`.
    #[default]
    Fail,
    /// Log a warning, overwrite the file with the defaults and use them.
    ResetToDefault,
}

#[derive(Clone, Debug)]
pub struct TableFormOptions {
    pub config_path: PathBuf,
    /// SQLite file receiving the form templates, in memory when None.
    pub database_path: Option<PathBuf>,
    pub on_invalid: InvalidConfigPolicy,
}

impl Default for TableFormOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            database_path: None,
            on_invalid: InvalidConfigPolicy::default(),
        }
    }
}

impl TableFormOptions {
    pub fn with_config_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Default::default()
        }
    }

    /// Defaults, with the config path taken from `TABLE_FORM_CONFIG` when set.
    pub fn from_env() -> Self {
        match env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => {
                log::info!("{} set, using config file {}", CONFIG_PATH_ENV, path);
                Self::with_config_path(path)
            }
            _ => Self::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("content is neither JSON ({json}) nor table/form YAML ({yaml})")]
    Unparseable {
        json: serde_json::Error,
        yaml: yaml::ParseError,
    },
    #[error("expected an object with a `models` list")]
    InvalidShape,
    #[error("invalid model definition: {0}")]
    InvalidModel(#[source] serde_json::Error),
}

/// Parses config file content: JSON first, then the YAML subset. The
/// result keeps the parsed document unchanged.
pub fn parse_config(content: &str) -> Result<TableFormConfig, ConfigError> {
    let document = match serde_json::from_str::<Value>(content) {
        Ok(document) => document,
        Err(json) => yaml::parse(content).map_err(|yaml| ConfigError::Unparseable { json, yaml })?,
    };
    TableFormConfig::from_document(document)
}

/// Counts of rows written by [`TableFormService::sync_templates`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub templates_inserted: usize,
    pub templates_updated: usize,
    pub fields_inserted: usize,
    pub fields_updated: usize,
}

/// Owns the table/form configuration for the life of the process. Create
/// one at start-up and hand it to whatever needs model configs.
pub struct TableFormService {
    options: TableFormOptions,
    db: Db,
    config: Option<TableFormConfig>,
}

impl TableFormService {
    /// Opens the database named in the options and prepares its schema.
    /// Nothing is loaded until `initialize()`.
    pub fn open(options: TableFormOptions) -> Result<Self> {
        let db = match &options.database_path {
            Some(path) => Db::open(path)?,
            None => Db::open_memory()?,
        };
        Self::with_db(options, db)
    }

    pub fn with_db(options: TableFormOptions, db: Db) -> Result<Self> {
        db.migrate(&forms::migrations())?;
        Ok(Self {
            options,
            db,
            config: None,
        })
    }

    /// Loads the config file (writing the defaults if it is missing),
    /// syncs the form templates into the database and caches the result.
    /// Later calls return the cached config without touching the file or
    /// the database.
    pub fn initialize(&mut self) -> Result<&TableFormConfig> {
        if self.config.is_none() {
            let config = self.load()?;
            let report = self.sync_templates(&config)?;
            log::info!(
                "Loaded {} table/form models from {} ({:?})",
                config.models().len(),
                self.options.config_path.display(),
                report
            );
            self.config = Some(config);
        }
        self.config
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Table/form config not loaded"))
    }

    pub fn get_config(&mut self) -> Result<&TableFormConfig> {
        self.initialize()
    }

    pub fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    pub fn config_path(&self) -> &Path {
        &self.options.config_path
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Overwrites the config file with the defaults, syncs them and makes
    /// them the current config.
    pub fn reset_to_defaults(&mut self) -> Result<&TableFormConfig> {
        let config = self.write_defaults()?;
        self.sync_templates(&config)?;
        log::info!("Reset table/form config at {}", self.options.config_path.display());
        Ok(self.config.insert(config))
    }

    /// Upserts every model's form template and its fields, in one
    /// transaction keyed by template id and field id.
    pub fn sync_templates(&self, config: &TableFormConfig) -> Result<SyncReport> {
        self.db.transaction(|t| {
            let mut report = SyncReport::default();
            for template in config.form_templates() {
                if t.upsert(&FormTemplate::from_definition(template)?)?.is_insert() {
                    report.templates_inserted += 1;
                } else {
                    report.templates_updated += 1;
                }
                for (position, field) in template.fields.iter().enumerate() {
                    let row = FormField::from_definition(&template.id, position, field)?;
                    if t.upsert(&row)?.is_insert() {
                        report.fields_inserted += 1;
                    } else {
                        report.fields_updated += 1;
                    }
                }
            }
            Ok(report)
        })
    }

    fn load(&self) -> Result<TableFormConfig> {
        let path = &self.options.config_path;
        if !path.exists() {
            log::info!("No table/form config at {}, writing defaults", path.display());
            return self.write_defaults();
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read table/form config {}", path.display()))?;
        match parse_config(&content) {
            Ok(config) => Ok(config),
            Err(err) => match self.options.on_invalid {
                InvalidConfigPolicy::Fail => Err(anyhow::Error::new(err)
                    .context(format!("Invalid table/form config {}", path.display()))),
                InvalidConfigPolicy::ResetToDefault => {
                    log::warn!(
                        "Invalid table/form config {}: {}; replacing it with defaults",
                        path.display(),
                        err
                    );
                    self.write_defaults()
                }
            },
        }
    }

    fn write_defaults(&self) -> Result<TableFormConfig> {
        let path = &self.options.config_path;
        let config = default_config();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        // JSON is read before the YAML subset, so the file loads either way.
        let mut content = serde_json::to_string_pretty(&config)?;
        content.push('\n');
        fs::write(path, content)
            .with_context(|| format!("Failed to write table/form config {}", path.display()))?;
        Ok(config)
    }
}
