//! Request body validation derived from entity descriptors
//!
//! A [`BodySchema`] is built once per entity and mode. It checks a JSON body
//! field by field, collects every violation instead of stopping at the first,
//! and returns the normalized user fields (dates rewritten to the stored
//! canonical form).

use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::descriptor::{EntityDescriptor, FieldDescriptor, FieldVariant};
use crate::utils::time::{format_timestamp, millis_to_datetime, parse_timestamp};

/// One rejected field of a request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldViolation {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaMode {
    /// Required fields must be present
    Create,
    /// Every field is optional; `null` clears a field
    Update,
}

/// Body validator for one entity and mode
#[derive(Debug, Clone)]
pub struct BodySchema {
    mode: SchemaMode,
    descriptor: EntityDescriptor,
}

impl BodySchema {
    pub fn for_create(descriptor: &EntityDescriptor) -> Self {
        Self {
            mode: SchemaMode::Create,
            descriptor: descriptor.clone(),
        }
    }

    pub fn for_update(descriptor: &EntityDescriptor) -> Self {
        Self {
            mode: SchemaMode::Update,
            descriptor: descriptor.clone(),
        }
    }

    pub fn mode(&self) -> SchemaMode {
        self.mode
    }

    /// Validate a body, returning the normalized user fields
    pub fn validate(&self, body: &Value) -> Result<Map<String, Value>, Vec<FieldViolation>> {
        let Some(object) = body.as_object() else {
            return Err(vec![FieldViolation::new(
                "",
                "type",
                "request body must be a JSON object",
            )]);
        };

        let mut violations = Vec::new();
        let mut out = Map::new();

        for (key, value) in object {
            let Some(field) = self.descriptor.field(key) else {
                violations.push(FieldViolation::new(key, "unknown", "unknown field"));
                continue;
            };
            if field.readonly {
                violations.push(FieldViolation::new(key, "readonly", "field is read-only"));
                continue;
            }
            if value.is_null() {
                match self.mode {
                    SchemaMode::Update if field.required => violations.push(FieldViolation::new(
                        key,
                        "required",
                        "required field cannot be cleared",
                    )),
                    SchemaMode::Update => {
                        out.insert(key.clone(), Value::Null);
                    }
                    SchemaMode::Create => {}
                }
                continue;
            }
            match coerce(field, value) {
                Ok(normalized) => {
                    out.insert(key.clone(), normalized);
                }
                Err(violation) => violations.push(violation),
            }
        }

        if self.mode == SchemaMode::Create {
            for field in self.descriptor.writable_fields().filter(|f| f.required) {
                let present = object.get(&field.name).is_some_and(|v| !v.is_null());
                if !present {
                    violations.push(FieldViolation::new(
                        &field.name,
                        "required",
                        "field is required",
                    ));
                }
            }
        }

        if violations.is_empty() {
            Ok(out)
        } else {
            Err(violations)
        }
    }
}

fn coerce(field: &FieldDescriptor, value: &Value) -> Result<Value, FieldViolation> {
    let fail = |code: &str, message: String| FieldViolation::new(&field.name, code, message);
    let expected = |what: &str| fail("type", format!("expected {}", what));

    match field.variant {
        FieldVariant::Text => {
            let s = value.as_str().ok_or_else(|| expected("a string"))?;
            if let Some(max) = field.max_length
                && s.chars().count() > max
            {
                return Err(fail(
                    "max_length",
                    format!("must be at most {} characters", max),
                ));
            }
            Ok(value.clone())
        }
        FieldVariant::Number | FieldVariant::Range => {
            if value.as_f64().is_some_and(f64::is_finite) {
                Ok(value.clone())
            } else {
                Err(expected("a number"))
            }
        }
        FieldVariant::Boolean => {
            if value.is_boolean() {
                Ok(value.clone())
            } else {
                Err(expected("true or false"))
            }
        }
        FieldVariant::Date => coerce_date(value)
            .map(Value::String)
            .ok_or_else(|| expected("an RFC 3339 date or epoch milliseconds")),
        FieldVariant::DateRange => {
            let range = value
                .as_object()
                .ok_or_else(|| expected("an object with 'start' and 'end'"))?;
            if range.keys().any(|k| k != "start" && k != "end") {
                return Err(expected("an object with only 'start' and 'end'"));
            }
            let bound = |key: &str| {
                range
                    .get(key)
                    .and_then(coerce_date)
                    .ok_or_else(|| expected(&format!("a valid '{}' date", key)))
            };
            let (start, end) = (bound("start")?, bound("end")?);
            if start > end {
                return Err(fail("range", "start must not be after end".to_string()));
            }
            let mut normalized = Map::new();
            normalized.insert("start".to_string(), Value::String(start));
            normalized.insert("end".to_string(), Value::String(end));
            Ok(Value::Object(normalized))
        }
        FieldVariant::Select => {
            let s = value.as_str().ok_or_else(|| expected("a string"))?;
            if !field.allows_option(s) {
                return Err(fail(
                    "option",
                    format!("must be one of: {}", field.options.join(", ")),
                ));
            }
            Ok(value.clone())
        }
        FieldVariant::MultiSelect => {
            let items = value
                .as_array()
                .ok_or_else(|| expected("an array of strings"))?;
            let mut seen = Vec::with_capacity(items.len());
            for item in items {
                let s = item.as_str().ok_or_else(|| expected("an array of strings"))?;
                if !field.allows_option(s) {
                    return Err(fail(
                        "option",
                        format!("'{}' is not one of: {}", s, field.options.join(", ")),
                    ));
                }
                if !seen.contains(&s) {
                    seen.push(s);
                }
            }
            Ok(Value::from(seen))
        }
    }
}

/// Canonical stored form of a date given as a string or epoch milliseconds
fn coerce_date(value: &Value) -> Option<String> {
    let dt = match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n.as_i64().and_then(millis_to_datetime),
        _ => None,
    };
    dt.map(format_timestamp)
}
