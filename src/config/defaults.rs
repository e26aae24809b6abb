use crate::config::model::{
    AttributeSource, DetailAttribute, FieldDefinition, FormTemplateDefinition, ModelConfig,
    TableColumn, TableFormConfig, TemplateStatus, ValueFormat,
};

/// Built-in configuration used when no config file exists yet: product,
/// property and tour models.
pub fn default_config() -> TableFormConfig {
    TableFormConfig::from_models(vec![product(), property(), tour()])
}

fn product() -> ModelConfig {
    ModelConfig {
        id: "product".into(),
        label: "Product".into(),
        table_columns: vec![
            column("name", "Name", None, true),
            column("category", "Category", None, true),
            column("price", "Price", Some("currency"), true),
            column("stock", "Stock", Some("number"), true),
            TableColumn {
                badge: Some(true),
                ..column("status", "Status", Some("badge"), false)
            },
        ],
        detail_attributes: vec![
            attribute("name", "Name", AttributeSource::Base, None),
            attribute("description", "Description", AttributeSource::Base, None),
            attribute("price", "Price", AttributeSource::Base, Some(ValueFormat::Currency)),
            attribute("stock", "Units in stock", AttributeSource::Base, Some(ValueFormat::Number)),
            DetailAttribute {
                badge: Some(true),
                description: Some("Manufacturer or label shown on the listing".into()),
                ..attribute("brand", "Brand", AttributeSource::Custom, Some(ValueFormat::Text))
            },
            DetailAttribute {
                badge: Some(true),
                ..attribute("materials", "Materials", AttributeSource::Custom, None)
            },
        ],
        form_template: Some(FormTemplateDefinition {
            id: "product-form".into(),
            title: "Product listing".into(),
            entity: "product".into(),
            description: Some("Create or edit a product listing".into()),
            status: TemplateStatus::Published,
            allowed_roles: roles(&["admin", "seller"]),
            fields: vec![
                field("product", "name", "Name", "text", true, &["required", "maxLength:120"]),
                field("product", "description", "Description", "textarea", false, &[]),
                field("product", "price", "Price", "currency", true, &["required", "min:0"]),
                field("product", "stock", "Stock", "number", true, &["required", "integer", "min:0"]),
                field("product", "category", "Category", "select", true, &["required"]),
                FieldDefinition {
                    description: Some("Stored as a custom attribute".into()),
                    ..field("product", "brand", "Brand", "text", false, &[])
                },
            ],
        }),
    }
}

fn property() -> ModelConfig {
    ModelConfig {
        id: "property".into(),
        label: "Property".into(),
        table_columns: vec![
            column("title", "Title", None, true),
            column("location", "Location", None, true),
            column("pricePerNight", "Price / night", Some("currency"), true),
            column("maxGuests", "Guests", Some("number"), true),
            TableColumn {
                badge: Some(true),
                ..column("propertyType", "Type", Some("badge"), false)
            },
        ],
        detail_attributes: vec![
            attribute("title", "Title", AttributeSource::Base, None),
            attribute("location", "Location", AttributeSource::Base, None),
            attribute("pricePerNight", "Price per night", AttributeSource::Base, Some(ValueFormat::Currency)),
            attribute("bedrooms", "Bedrooms", AttributeSource::Base, Some(ValueFormat::Number)),
            attribute("maxGuests", "Maximum guests", AttributeSource::Base, Some(ValueFormat::Number)),
            attribute("amenities", "Amenities", AttributeSource::Base, None),
            DetailAttribute {
                badge: Some(true),
                description: Some("Local check-in window".into()),
                ..attribute("checkInTime", "Check-in", AttributeSource::Custom, Some(ValueFormat::Text))
            },
        ],
        form_template: Some(FormTemplateDefinition {
            id: "property-form".into(),
            title: "Property listing".into(),
            entity: "property".into(),
            description: Some("Create or edit a rental property".into()),
            status: TemplateStatus::Published,
            allowed_roles: roles(&["admin", "host"]),
            fields: vec![
                field("property", "title", "Title", "text", true, &["required", "maxLength:120"]),
                field("property", "location", "Location", "text", true, &["required"]),
                field("property", "pricePerNight", "Price per night", "currency", true, &["required", "min:0"]),
                field("property", "bedrooms", "Bedrooms", "number", true, &["required", "integer", "min:0"]),
                field("property", "maxGuests", "Maximum guests", "number", true, &["required", "integer", "min:1"]),
                field("property", "amenities", "Amenities", "multiselect", false, &[]),
                field("property", "checkInTime", "Check-in", "text", false, &[]),
            ],
        }),
    }
}

fn tour() -> ModelConfig {
    ModelConfig {
        id: "tour".into(),
        label: "Tour".into(),
        table_columns: vec![
            column("name", "Name", None, true),
            column("destination", "Destination", None, true),
            column("price", "Price", Some("currency"), true),
            column("durationDays", "Days", Some("number"), true),
            TableColumn {
                badge: Some(true),
                ..column("difficulty", "Difficulty", Some("badge"), false)
            },
        ],
        detail_attributes: vec![
            attribute("name", "Name", AttributeSource::Base, None),
            attribute("destination", "Destination", AttributeSource::Base, None),
            attribute("price", "Price", AttributeSource::Base, Some(ValueFormat::Currency)),
            attribute("durationDays", "Duration (days)", AttributeSource::Base, Some(ValueFormat::Number)),
            attribute("maxGroupSize", "Group size", AttributeSource::Base, Some(ValueFormat::Number)),
            DetailAttribute {
                badge: Some(true),
                ..attribute("included", "Included", AttributeSource::Custom, None)
            },
            DetailAttribute {
                badge: Some(true),
                description: Some("Where the group meets on day one".into()),
                ..attribute("meetingPoint", "Meeting point", AttributeSource::Custom, Some(ValueFormat::Text))
            },
        ],
        form_template: Some(FormTemplateDefinition {
            id: "tour-form".into(),
            title: "Tour".into(),
            entity: "tour".into(),
            description: Some("Create or edit a guided tour".into()),
            status: TemplateStatus::Published,
            allowed_roles: roles(&["admin", "guide"]),
            fields: vec![
                field("tour", "name", "Name", "text", true, &["required", "maxLength:120"]),
                field("tour", "destination", "Destination", "text", true, &["required"]),
                field("tour", "price", "Price", "currency", true, &["required", "min:0"]),
                field("tour", "durationDays", "Duration (days)", "number", true, &["required", "integer", "min:1"]),
                field("tour", "maxGroupSize", "Group size", "number", false, &["integer", "min:1"]),
                field("tour", "meetingPoint", "Meeting point", "text", false, &[]),
            ],
        }),
    }
}

fn column(key: &str, label: &str, column_type: Option<&str>, sortable: bool) -> TableColumn {
    TableColumn {
        key: key.into(),
        label: label.into(),
        column_type: column_type.map(Into::into),
        sortable: Some(sortable),
        badge: None,
    }
}

fn attribute(
    key: &str,
    label: &str,
    source: AttributeSource,
    format: Option<ValueFormat>,
) -> DetailAttribute {
    DetailAttribute {
        key: key.into(),
        label: label.into(),
        source,
        format,
        badge: None,
        description: None,
    }
}

fn field(
    model: &str,
    name: &str,
    label: &str,
    field_type: &str,
    required: bool,
    validation: &[&str],
) -> FieldDefinition {
    FieldDefinition {
        id: format!("{}-{}", model, name),
        name: name.into(),
        label: label.into(),
        field_type: field_type.into(),
        required,
        description: None,
        validation: roles(validation),
        editable_roles: roles(&["admin", model_owner(model)]),
    }
}

fn model_owner(model: &str) -> &'static str {
    match model {
        "property" => "host",
        "tour" => "guide",
        _ => "seller",
    }
}

fn roles(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}
