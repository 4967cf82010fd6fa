//! JSON bibliography codec
//!
//! A cache file is a JSON array of records; field names are normalized on
//! decode so hand-edited files merge cleanly.

use serde_json::Value;

use super::Codec;
use crate::csl::Record;

pub fn codec() -> Codec {
    Codec {
        suffixes: &["json"],
        decode,
        encode: Some(encode),
    }
}

fn decode(text: &str) -> Result<Vec<Record>, String> {
    let items: Vec<Value> = serde_json::from_str(text).map_err(|e| e.to_string())?;
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(object) => Record::from_object(object).map_err(|e| e.to_string()),
            _ => Err(format!("entry {index} is not an object")),
        })
        .collect()
}

fn encode(records: &[Record]) -> Result<String, String> {
    serde_json::to_string_pretty(records)
        .map(|mut text| {
            text.push('\n');
            text
        })
        .map_err(|e| e.to_string())
}
