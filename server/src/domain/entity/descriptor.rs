//! Entity and field descriptors
//!
//! A descriptor is the single source of truth for one resource: which fields
//! exist, how they may be filtered and sorted, and how request bodies are
//! validated. Descriptors are built once at startup and never mutated.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::utils::sql::json_path;

/// System field holding the document id
pub const FIELD_ID: &str = "id";
/// System field holding the creation time
pub const FIELD_CREATED_AT: &str = "createdAt";
/// System field holding the last update time
pub const FIELD_UPDATED_AT: &str = "updatedAt";

const SYSTEM_FIELDS: [&str; 3] = [FIELD_ID, FIELD_CREATED_AT, FIELD_UPDATED_AT];

/// Value kind of a field; decides which operators apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum FieldVariant {
    Text,
    Number,
    Boolean,
    Date,
    DateRange,
    Select,
    MultiSelect,
    Range,
}

impl FieldVariant {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FieldVariant::Text => "text",
            FieldVariant::Number => "number",
            FieldVariant::Boolean => "boolean",
            FieldVariant::Date => "date",
            FieldVariant::DateRange => "dateRange",
            FieldVariant::Select => "select",
            FieldVariant::MultiSelect => "multiSelect",
            FieldVariant::Range => "range",
        }
    }
}

impl fmt::Display for FieldVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while building a descriptor (programming errors, caught at startup)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Invalid name '{0}': must match [A-Za-z][A-Za-z0-9_]*")]
    InvalidName(String),

    #[error("Duplicate field '{field}' in entity '{entity}'")]
    DuplicateField { entity: String, field: String },

    #[error("Field '{0}' is reserved for system use")]
    ReservedField(String),

    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Entity '{0}' is already registered")]
    DuplicateEntity(String),

    #[error("Entity name '{0}' collides with a built-in route")]
    ReservedEntity(String),
}

/// One field of an entity
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    pub variant: FieldVariant,
    pub sortable: bool,
    pub filterable: bool,
    pub required: bool,
    pub readonly: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// SQL expression yielding the stored value (set by the entity builder)
    #[serde(skip)]
    column: String,
}

impl FieldDescriptor {
    /// Filterable, unsorted, optional field of the given variant
    pub fn new(name: impl Into<String>, variant: FieldVariant) -> Self {
        Self {
            name: name.into(),
            variant,
            sortable: false,
            filterable: true,
            required: false,
            readonly: false,
            options: Vec::new(),
            max_length: None,
            label: None,
            column: String::new(),
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldVariant::Text)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldVariant::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldVariant::Boolean)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldVariant::Date)
    }

    pub fn date_range(name: impl Into<String>) -> Self {
        Self::new(name, FieldVariant::DateRange)
    }

    pub fn range(name: impl Into<String>) -> Self {
        Self::new(name, FieldVariant::Range)
    }

    pub fn select<I, S>(name: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut field = Self::new(name, FieldVariant::Select);
        field.options = options.into_iter().map(Into::into).collect();
        field
    }

    pub fn multi_select<I, S>(name: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut field = Self::new(name, FieldVariant::MultiSelect);
        field.options = options.into_iter().map(Into::into).collect();
        field
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn not_filterable(mut self) -> Self {
        self.filterable = false;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// SQL expression for the whole stored value
    pub fn column(&self) -> &str {
        &self.column
    }

    /// SQL expression for one key of an object-valued field (`dateRange`)
    pub fn subcolumn(&self, key: &str) -> String {
        format!("json_extract(data, '{}.{}')", json_path(&self.name), key)
    }

    /// SQL expression used in ORDER BY (a date range sorts by its start)
    pub fn sort_column(&self) -> String {
        match self.variant {
            FieldVariant::DateRange => self.subcolumn("start"),
            _ => self.column.clone(),
        }
    }

    /// Whether `value` is among the declared options (no options = anything goes)
    pub fn allows_option(&self, value: &str) -> bool {
        self.options.is_empty() || self.options.iter().any(|o| o == value)
    }

    pub fn is_system(&self) -> bool {
        SYSTEM_FIELDS.contains(&self.name.as_str())
    }

    fn check(&self) -> Result<(), SchemaError> {
        let invalid = |reason: &str| SchemaError::InvalidField {
            field: self.name.clone(),
            reason: reason.to_string(),
        };
        match self.variant {
            FieldVariant::Select | FieldVariant::MultiSelect if self.options.is_empty() => {
                return Err(invalid("select fields must declare options"));
            }
            FieldVariant::MultiSelect if self.sortable => {
                return Err(invalid("multiSelect fields cannot be sortable"));
            }
            _ => {}
        }
        if self.max_length.is_some() && self.variant != FieldVariant::Text {
            return Err(invalid("maxLength only applies to text fields"));
        }
        if self.required && self.readonly {
            return Err(invalid("a field cannot be both required and readonly"));
        }
        Ok(())
    }
}

/// Static description of one resource
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    name: String,
    label: Option<String>,
    fields: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
}

impl EntityDescriptor {
    pub fn builder(name: impl Into<String>) -> EntityDescriptorBuilder {
        EntityDescriptorBuilder {
            name: name.into(),
            label: None,
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// All fields, system fields first
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Fields a client may write (everything not readonly)
    pub fn writable_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.readonly)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.index.get(name).map(|&i| &self.fields[i])
    }
}

/// Builder adding system fields and precomputing the field map
#[derive(Debug)]
pub struct EntityDescriptorBuilder {
    name: String,
    label: Option<String>,
    fields: Vec<FieldDescriptor>,
}

impl EntityDescriptorBuilder {
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Result<EntityDescriptor, SchemaError> {
        if !is_identifier(&self.name) {
            return Err(SchemaError::InvalidName(self.name));
        }

        let mut fields = vec![
            FieldDescriptor::text(FIELD_ID).sortable().readonly(),
            FieldDescriptor::date(FIELD_CREATED_AT).sortable().readonly(),
            FieldDescriptor::date(FIELD_UPDATED_AT).sortable().readonly(),
        ];
        fields[0].column = "id".to_string();
        fields[1].column = "created_at".to_string();
        fields[2].column = "updated_at".to_string();

        for mut field in self.fields {
            if !is_identifier(&field.name) {
                return Err(SchemaError::InvalidName(field.name));
            }
            if SYSTEM_FIELDS.contains(&field.name.as_str()) {
                return Err(SchemaError::ReservedField(field.name));
            }
            if fields.iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    entity: self.name,
                    field: field.name,
                });
            }
            field.check()?;
            field.column = format!("json_extract(data, '{}')", json_path(&field.name));
            fields.push(field);
        }

        let index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();

        Ok(EntityDescriptor {
            name: self.name,
            label: self.label,
            fields,
            index,
        })
    }
}

/// `[A-Za-z][A-Za-z0-9_]*`
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
