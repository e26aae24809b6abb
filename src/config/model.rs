use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::config::ConfigError;

/// Top level of the table/form configuration file.
///
/// A config read from a file keeps the document exactly as it was parsed,
/// unknown keys and omitted defaults included, and serializes back to it.
/// The typed models are a read-only view of that document.
#[derive(Clone, Debug, Default)]
pub struct TableFormConfig {
    models: Vec<ModelConfig>,
    document: Option<Value>,
}

impl TableFormConfig {
    pub fn from_models(models: Vec<ModelConfig>) -> Self {
        Self {
            models,
            document: None,
        }
    }

    /// Wraps a parsed document, which must be an object with a `models` list.
    pub fn from_document(document: Value) -> Result<Self, ConfigError> {
        let models = match document.get("models") {
            Some(models @ Value::Array(_)) => {
                Vec::<ModelConfig>::deserialize(models).map_err(ConfigError::InvalidModel)?
            }
            _ => return Err(ConfigError::InvalidShape),
        };
        Ok(Self {
            models,
            document: Some(document),
        })
    }

    pub fn models(&self) -> &[ModelConfig] {
        &self.models
    }

    pub fn into_models(self) -> Vec<ModelConfig> {
        self.models
    }

    /// The parsed file content, None for a config built in code.
    pub fn document(&self) -> Option<&Value> {
        self.document.as_ref()
    }

    pub fn model(&self, id: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn form_templates(&self) -> impl Iterator<Item = &FormTemplateDefinition> {
        self.models.iter().filter_map(|m| m.form_template.as_ref())
    }
}

#[derive(Serialize)]
struct ModelsDocument<'a> {
    models: &'a [ModelConfig],
}

impl Serialize for TableFormConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.document {
            Some(document) => document.serialize(serializer),
            None => ModelsDocument {
                models: &self.models,
            }
            .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for TableFormConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = Value::deserialize(deserializer)?;
        Self::from_document(document).map_err(serde::de::Error::custom)
    }
}

/// Configs are equal when they serialize to the same document.
impl PartialEq for TableFormConfig {
    fn eq(&self, other: &Self) -> bool {
        match (serde_json::to_value(self), serde_json::to_value(other)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

/// Table, detail view and form description of one business entity type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub id: String,
    pub label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub table_columns: Vec<TableColumn>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub detail_attributes: Vec<DetailAttribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_template: Option<FormTemplateDefinition>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub key: String,
    pub label: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sortable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<bool>,
}

/// Where a detail attribute's value lives on a record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeSource {
    /// A top-level field of the record.
    #[default]
    Base,
    /// An entry of the record's `customAttributes` map.
    Custom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueFormat {
    Currency,
    Number,
    Text,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailAttribute {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub source: AttributeSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ValueFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    #[default]
    Draft,
    Published,
}

impl TemplateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateStatus::Draft => "draft",
            TemplateStatus::Published => "published",
        }
    }
}

/// Role-scoped data-entry form for one entity type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormTemplateDefinition {
    pub id: String,
    pub title: String,
    /// Name of the entity type the form edits.
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TemplateStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allowed_roles: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Vec<FieldDefinition>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: String,
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Names of validation rules applied to the input.
    #[serde(default, deserialize_with = "null_as_default")]
    pub validation: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub editable_roles: Vec<String>,
}

/// The YAML subset writes an empty `key:` as null.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
