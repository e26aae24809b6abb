//! Relational form of the configured form templates: one `FormTemplate`
//! row per template and one `FormField` row per field. List-valued
//! attributes are stored as JSON text.

use anyhow::Result;
use rusqlite_migration::{Migrations, M};
use serde::{Deserialize, Serialize};

use crate::config::{FieldDefinition, FormTemplateDefinition, TemplateStatus};
use crate::db::{Db, DbTransaction};

pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        "CREATE TABLE FormTemplate (
            id            TEXT NOT NULL PRIMARY KEY,
            title         TEXT NOT NULL,
            entity        TEXT NOT NULL,
            description   TEXT,
            status        TEXT NOT NULL,
            allowed_roles TEXT NOT NULL
        );

        CREATE TABLE FormField (
            id             TEXT NOT NULL PRIMARY KEY,
            template_id    TEXT NOT NULL,
            position       INTEGER NOT NULL,
            name           TEXT NOT NULL,
            label          TEXT NOT NULL,
            field_type     TEXT NOT NULL,
            required       BOOLEAN NOT NULL DEFAULT 0,
            description    TEXT,
            validation     TEXT NOT NULL,
            editable_roles TEXT NOT NULL,
            FOREIGN KEY (template_id) REFERENCES FormTemplate (id)
        );

        CREATE INDEX idx_form_field_template ON FormField (template_id);",
    )])
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormTemplate {
    pub id: String,
    pub title: String,
    pub entity: String,
    pub description: Option<String>,
    pub status: String,
    pub allowed_roles: String,
}

impl FormTemplate {
    pub fn from_definition(template: &FormTemplateDefinition) -> Result<Self> {
        Ok(Self {
            id: template.id.clone(),
            title: template.title.clone(),
            entity: template.entity.clone(),
            description: template.description.clone(),
            status: template.status.as_str().to_string(),
            allowed_roles: serde_json::to_string(&template.allowed_roles)?,
        })
    }

    pub fn status(&self) -> Result<TemplateStatus> {
        Ok(serde_json::from_value(serde_json::Value::String(self.status.clone()))?)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub id: String,
    pub template_id: String,
    pub position: i64,
    pub name: String,
    pub label: String,
    pub field_type: String,
    pub required: bool,
    pub description: Option<String>,
    pub validation: String,
    pub editable_roles: String,
}

impl FormField {
    pub fn from_definition(template_id: &str, position: usize, field: &FieldDefinition) -> Result<Self> {
        Ok(Self {
            id: field.id.clone(),
            template_id: template_id.to_string(),
            position: i64::try_from(position)?,
            name: field.name.clone(),
            label: field.label.clone(),
            field_type: field.field_type.clone(),
            required: field.required,
            description: field.description.clone(),
            validation: serde_json::to_string(&field.validation)?,
            editable_roles: serde_json::to_string(&field.editable_roles)?,
        })
    }

    pub fn to_definition(&self) -> Result<FieldDefinition> {
        Ok(FieldDefinition {
            id: self.id.clone(),
            name: self.name.clone(),
            label: self.label.clone(),
            field_type: self.field_type.clone(),
            required: self.required,
            description: self.description.clone(),
            validation: serde_json::from_str(&self.validation)?,
            editable_roles: serde_json::from_str(&self.editable_roles)?,
        })
    }
}

impl DbTransaction<'_> {
    /// Reassembles a stored template with its fields in position order.
    pub fn load_form_template(&self, id: &str) -> Result<Option<FormTemplateDefinition>> {
        let Some(template) = self.get::<FormTemplate>(id)? else {
            return Ok(None);
        };
        let fields = self
            .query::<FormField, _>(
                "SELECT * FROM FormField WHERE template_id = ? ORDER BY position",
                [id],
            )?
            .iter()
            .map(FormField::to_definition)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(FormTemplateDefinition {
            id: template.id.clone(),
            title: template.title.clone(),
            entity: template.entity.clone(),
            description: template.description.clone(),
            status: template.status()?,
            allowed_roles: serde_json::from_str(&template.allowed_roles)?,
            fields,
        }))
    }
}

impl Db {
    pub fn load_form_template(&self, id: &str) -> Result<Option<FormTemplateDefinition>> {
        self.transaction(|t| t.load_form_template(id))
    }

    pub fn form_templates(&self) -> Result<Vec<FormTemplate>> {
        self.query("SELECT * FROM FormTemplate ORDER BY id", [])
    }
}
