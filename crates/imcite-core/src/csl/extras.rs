//! Extension fields encoded in a record's note
//!
//! Reference managers without native support for fields like
//! "original-date" carry them as `name: value` lines (or the braced
//! `{:name: value}` form) inside the free-text note. Extraction parses
//! those lines back out after normalization; date-shaped values follow a
//! constrained range grammar.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use thiserror::Error;

use super::{names, normalize_field_name, Record};

lazy_static! {
    static ref PLAIN_LINE: Regex =
        Regex::new(r"^\s*([A-Za-z][A-Za-z0-9 _-]*?)\s*:\s+(\S.*?)\s*$").unwrap();
    static ref BRACED_LINE: Regex =
        Regex::new(r"^\s*\{:\s*([A-Za-z][A-Za-z0-9 _-]*?)\s*:\s+(\S.*?)\s*\}\s*$").unwrap();
}

/// Which piece of a date fragment failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Year,
    Month,
    Day,
}

impl fmt::Display for DatePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatePart::Year => write!(f, "year"),
            DatePart::Month => write!(f, "month"),
            DatePart::Day => write!(f, "day"),
        }
    }
}

/// Malformed date value in a note-encoded extra field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateParseError {
    #[error("{field}: missing from date")]
    MissingFromDate { field: String },
    #[error("{field}: missing to date")]
    MissingToDate { field: String },
    #[error("{field}: too many dates")]
    TooManyDates { field: String },
    #[error("{field}: too many date parts")]
    TooManyParts { field: String },
    #[error("{field}: malformed {part}")]
    MalformedPart { field: String, part: DatePart },
}

/// Extract `(field, value)` extras from a note.
///
/// Scans line by line; a line that matches neither encoding yields nothing,
/// and there are no partial matches within a line. Each call returns a
/// fresh iterator.
pub fn extract_extras(note: &str) -> impl Iterator<Item = (String, String)> + '_ {
    note.lines().filter_map(|line| {
        let caps = BRACED_LINE
            .captures(line)
            .or_else(|| PLAIN_LINE.captures(line))?;
        let field = normalize_field_name(caps.get(1)?.as_str()).ok()?;
        Some((field, caps.get(2)?.as_str().to_string()))
    })
}

/// Apply note-encoded extras onto a record.
///
/// Date-shaped extras (field name ending in `date`) are parsed under the
/// range grammar into a `date-parts` value; failures are per-field and the
/// other extracted extras still apply. Author-shaped extras (name ending in
/// `author`) become one-element CSL name lists; everything else stays plain
/// text.
pub fn apply_extras(record: &Record) -> (Record, Vec<DateParseError>) {
    let mut updated = record.clone();
    let mut errors = Vec::new();
    let Some(note) = record.note().map(str::to_owned) else {
        return (updated, errors);
    };
    for (field, value) in extract_extras(&note) {
        if field.ends_with("date") {
            match parse_date_value(&field, &value) {
                Ok(parsed) => updated.insert_normalized(field, parsed),
                Err(error) => errors.push(error),
            }
        } else if field.ends_with("author") {
            updated.insert_normalized(field, Value::Array(vec![names::parse_name(&value)]));
        } else {
            updated.insert_normalized(field, Value::String(value));
        }
    }
    (updated, errors)
}

/// Parse one or two ISO-ish date fragments separated by `/` into a
/// `{"date-parts": [...]}` value with string parts.
fn parse_date_value(field: &str, value: &str) -> Result<Value, DateParseError> {
    let fragments: Vec<&str> = value.split('/').collect();
    if fragments.len() > 2 {
        return Err(DateParseError::TooManyDates {
            field: field.to_string(),
        });
    }
    let from = fragments[0].trim();
    if from.is_empty() {
        return Err(DateParseError::MissingFromDate {
            field: field.to_string(),
        });
    }
    let mut parts = vec![parse_date_fragment(field, from)?];
    if fragments.len() == 2 {
        let to = fragments[1].trim();
        if to.is_empty() {
            return Err(DateParseError::MissingToDate {
                field: field.to_string(),
            });
        }
        parts.push(parse_date_fragment(field, to)?);
    }
    Ok(json!({ "date-parts": parts }))
}

fn parse_date_fragment(field: &str, fragment: &str) -> Result<Value, DateParseError> {
    let pieces: Vec<&str> = fragment.split('-').collect();
    if pieces.len() > 3 {
        return Err(DateParseError::TooManyParts {
            field: field.to_string(),
        });
    }
    let mut out = Vec::new();
    for (piece, part) in pieces
        .iter()
        .zip([DatePart::Year, DatePart::Month, DatePart::Day])
    {
        let width = match part {
            DatePart::Year => 4,
            _ => 2,
        };
        if piece.is_empty() || piece.len() > width || !piece.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DateParseError::MalformedPart {
                field: field.to_string(),
                part,
            });
        }
        out.push(Value::String((*piece).to_string()));
    }
    Ok(Value::Array(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_with_note(note: &str) -> Record {
        let mut record = Record::new();
        record.set_id("test");
        record.insert("note", json!(note)).unwrap();
        record
    }

    #[test]
    fn test_extract_both_encodings() {
        let note = "original-date: 1970\n{:original-author: Doe, Jane}\nplain prose line";
        let extras: Vec<_> = extract_extras(note).collect();
        assert_eq!(
            extras,
            vec![
                ("original-date".to_string(), "1970".to_string()),
                ("original-author".to_string(), "Doe, Jane".to_string()),
            ]
        );
    }

    #[test]
    fn test_extract_normalizes_field_names() {
        let extras: Vec<_> = extract_extras("Original Date: 1970").collect();
        assert_eq!(extras[0].0, "original-date");
    }

    #[test]
    fn test_extract_is_restartable() {
        let note = "original-date: 1970";
        assert_eq!(extract_extras(note).count(), 1);
        assert_eq!(extract_extras(note).count(), 1);
    }

    #[test]
    fn test_extract_skips_urls() {
        // No space after the colon, so this is not an extra line.
        assert_eq!(extract_extras("see http://example.com/x").count(), 0);
    }

    #[test]
    fn test_apply_date_range() {
        let record = record_with_note("original-date: 1970-01-01/1970-02");
        let (updated, errors) = apply_extras(&record);
        assert!(errors.is_empty());
        assert_eq!(
            updated.get("original-date"),
            Some(&json!({
                "date-parts": [["1970", "01", "01"], ["1970", "02"]]
            }))
        );
    }

    #[test]
    fn test_apply_missing_from_date() {
        let record = record_with_note("original-date: /1970");
        let (updated, errors) = apply_extras(&record);
        assert_eq!(
            errors,
            vec![DateParseError::MissingFromDate {
                field: "original-date".to_string()
            }]
        );
        assert_eq!(updated.get("original-date"), None);
    }

    #[test]
    fn test_apply_missing_to_date() {
        let record = record_with_note("original-date: 1970/");
        let (_, errors) = apply_extras(&record);
        assert_eq!(
            errors,
            vec![DateParseError::MissingToDate {
                field: "original-date".to_string()
            }]
        );
    }

    #[test]
    fn test_apply_too_many_dates() {
        let record = record_with_note("original-date: 1970/1971/1972");
        let (_, errors) = apply_extras(&record);
        assert!(matches!(errors[0], DateParseError::TooManyDates { .. }));
    }

    #[test]
    fn test_apply_too_many_parts() {
        let record = record_with_note("original-date: 1970-01-01-01");
        let (_, errors) = apply_extras(&record);
        assert!(matches!(errors[0], DateParseError::TooManyParts { .. }));
    }

    #[test]
    fn test_apply_malformed_month() {
        let record = record_with_note("original-date: 1970-013");
        let (_, errors) = apply_extras(&record);
        assert_eq!(
            errors,
            vec![DateParseError::MalformedPart {
                field: "original-date".to_string(),
                part: DatePart::Month,
            }]
        );
    }

    #[test]
    fn test_bad_date_keeps_other_extras() {
        let record = record_with_note("original-date: not-a-date\noriginal-author: Doe, Jane");
        let (updated, errors) = apply_extras(&record);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            updated.get("original-author"),
            Some(&json!([{ "family": "Doe", "given": "Jane" }]))
        );
    }

    #[test]
    fn test_non_date_non_author_extra_stays_text() {
        let record = record_with_note("original-title: Les Mots");
        let (updated, errors) = apply_extras(&record);
        assert!(errors.is_empty());
        assert_eq!(updated.get("original-title"), Some(&json!("Les Mots")));
    }
}
