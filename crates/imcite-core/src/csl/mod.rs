//! CSL-style bibliographic records
//!
//! Records are ordered maps from normalized field names to JSON values.
//! Normalization runs at every insertion boundary (construction, merge,
//! decode), so lookups never depend on ambient case-insensitive matching.

pub mod extras;
pub mod names;

pub use extras::{apply_extras, extract_extras, DateParseError, DatePart};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Invalid bibliographic field name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldNameError {
    #[error("empty field name")]
    Empty,
    #[error("invalid character '{character}' in field name '{name}'")]
    InvalidCharacter { name: String, character: char },
}

/// Normalize a bibliographic field name.
///
/// Trims, lower-cases and collapses whitespace/underscore runs into a
/// single hyphen, so `"Original Date"`, `"ORIGINAL-DATE"` and
/// `"original_date"` all become `"original-date"`. Names that are empty
/// after trimming, or that contain a character outside letters, digits,
/// space, hyphen and underscore, are rejected.
pub fn normalize_field_name(name: &str) -> Result<String, FieldNameError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(FieldNameError::Empty);
    }
    for character in trimmed.chars() {
        if !(character.is_alphanumeric()
            || character == ' '
            || character == '-'
            || character == '_')
        {
            return Err(FieldNameError::InvalidCharacter {
                name: name.to_string(),
                character,
            });
        }
    }
    let mut normalized = String::with_capacity(trimmed.len());
    let mut pending_break = false;
    for character in trimmed.to_lowercase().chars() {
        if character == ' ' || character == '_' {
            pending_break = true;
        } else {
            if pending_break {
                normalized.push('-');
                pending_break = false;
            }
            normalized.push(character);
        }
    }
    Ok(normalized)
}

/// Recursively normalize every mapping key inside `value`.
///
/// Idempotent: normalizing an already-normalized value changes nothing.
pub fn normalize_value(value: Value) -> Result<Value, FieldNameError> {
    match value {
        Value::Object(object) => {
            let mut normalized = Map::new();
            for (name, inner) in object {
                normalized.insert(normalize_field_name(&name)?, normalize_value(inner)?);
            }
            Ok(Value::Object(normalized))
        }
        Value::Array(items) => Ok(Value::Array(
            items
                .into_iter()
                .map(normalize_value)
                .collect::<Result<_, _>>()?,
        )),
        scalar => Ok(scalar),
    }
}

/// A normalized bibliographic record.
///
/// The identity field `id` holds the citation key that produced the record.
/// Field iteration order is deterministic (sorted by name).
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a decoded JSON object, normalizing every mapping
    /// key at every depth.
    pub fn from_object(object: Map<String, Value>) -> Result<Record, FieldNameError> {
        let mut fields = Map::new();
        for (name, value) in object {
            fields.insert(normalize_field_name(&name)?, normalize_value(value)?);
        }
        Ok(Record { fields })
    }

    /// The citation key this record was resolved from.
    pub fn id(&self) -> Option<&str> {
        self.fields.get("id").and_then(Value::as_str)
    }

    pub fn set_id(&mut self, id: &str) {
        self.fields
            .insert("id".to_string(), Value::String(id.to_string()));
    }

    /// The free-text note, when present as a string.
    pub fn note(&self) -> Option<&str> {
        self.fields.get("note").and_then(Value::as_str)
    }

    /// Look a field up by any spelling of its name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let normalized = normalize_field_name(name).ok()?;
        self.fields.get(&normalized)
    }

    /// Insert a field, normalizing the name and every nested mapping key.
    pub fn insert(&mut self, name: &str, value: Value) -> Result<(), FieldNameError> {
        self.fields
            .insert(normalize_field_name(name)?, normalize_value(value)?);
        Ok(())
    }

    /// Insert under an already-normalized name.
    pub(crate) fn insert_normalized(&mut self, name: String, value: Value) {
        self.fields.insert(name, value);
    }

    /// Iterate fields in sorted name order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn as_object(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}
