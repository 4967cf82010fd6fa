//! YAML bibliography codec
//!
//! Decoding accepts any YAML mapping with a `references` list. Encoding
//! always produces double-quoted string scalars with escaped control
//! characters and a fixed preferred key order; rewriting the same record
//! set is byte-identical.

use serde_json::Value;

use super::Codec;
use crate::csl::Record;

/// Emission order within a record: identity first, type second, common
/// bibliographic fields, then anything else alphabetically.
const PREFERRED_ORDER: &[&str] = &[
    "id",
    "type",
    "author",
    "editor",
    "issued",
    "original-date",
    "title",
    "container-title",
    "collection-title",
    "publisher",
    "publisher-place",
    "edition",
    "volume",
    "issue",
    "page",
    "doi",
    "isbn",
    "issn",
    "url",
    "accessed",
    "language",
    "abstract",
    "note",
];

pub fn codec() -> Codec {
    Codec {
        suffixes: &["yaml", "yml"],
        decode,
        encode: Some(encode),
    }
}

fn decode(text: &str) -> Result<Vec<Record>, String> {
    let document: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
    let references = document
        .get("references")
        .cloned()
        .unwrap_or(serde_yaml::Value::Null);
    let items = match references {
        serde_yaml::Value::Null => Vec::new(),
        serde_yaml::Value::Sequence(items) => items,
        _ => return Err("'references' is not a list".to_string()),
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match to_json(item)? {
            Value::Object(object) => Record::from_object(object).map_err(|e| e.to_string()),
            _ => Err(format!("reference {index} is not a mapping")),
        })
        .collect()
}

fn to_json(value: serde_yaml::Value) -> Result<Value, String> {
    match value {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(i.into()))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(u.into()))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("unrepresentable number {f}"))
            } else {
                Err("unrepresentable number".to_string())
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s)),
        serde_yaml::Value::Sequence(items) => Ok(Value::Array(
            items.into_iter().map(to_json).collect::<Result<_, _>>()?,
        )),
        serde_yaml::Value::Mapping(mapping) => {
            let mut object = serde_json::Map::new();
            for (name, inner) in mapping {
                let serde_yaml::Value::String(name) = name else {
                    return Err("mapping key is not a string".to_string());
                };
                object.insert(name, to_json(inner)?);
            }
            Ok(Value::Object(object))
        }
        serde_yaml::Value::Tagged(tagged) => to_json(tagged.value),
    }
}

fn encode(records: &[Record]) -> Result<String, String> {
    let mut out = String::from("---\nreferences:\n");
    for record in records {
        let mut first = true;
        for (name, value) in ordered_fields(record) {
            out.push_str(if first { "- " } else { "  " });
            first = false;
            out.push_str(name);
            out.push(':');
            emit_value(&mut out, value, 2);
        }
        if first {
            out.push_str("- {}\n");
        }
    }
    out.push_str("...\n");
    Ok(out)
}

fn ordered_fields(record: &Record) -> Vec<(&str, &Value)> {
    let mut fields: Vec<(&str, &Value)> = Vec::new();
    for name in PREFERRED_ORDER {
        if let Some(value) = record.as_object().get(*name) {
            fields.push((name, value));
        }
    }
    for (name, value) in record.fields() {
        if !PREFERRED_ORDER.contains(&name.as_str()) {
            fields.push((name, value));
        }
    }
    fields
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

/// Write `value` where the caller has just written `name:` or `-` with no
/// trailing newline.
fn emit_value(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            out.push('\n');
            for (name, inner) in map {
                out.push_str(&indent(depth));
                out.push_str(name);
                out.push(':');
                emit_value(out, inner, depth + 1);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            out.push('\n');
            for item in items {
                out.push_str(&indent(depth));
                out.push('-');
                match item {
                    Value::Object(map) if !map.is_empty() => {
                        let mut first = true;
                        for (name, inner) in map {
                            if first {
                                out.push(' ');
                                first = false;
                            } else {
                                out.push_str(&indent(depth + 1));
                            }
                            out.push_str(name);
                            out.push(':');
                            emit_value(out, inner, depth + 2);
                        }
                    }
                    other => emit_value(out, other, depth + 1),
                }
            }
        }
        Value::Object(_) => out.push_str(" {}\n"),
        Value::Array(_) => out.push_str(" []\n"),
        Value::Null => out.push_str(" null\n"),
        Value::Bool(true) => out.push_str(" true\n"),
        Value::Bool(false) => out.push_str(" false\n"),
        Value::Number(number) => {
            out.push(' ');
            out.push_str(&number.to_string());
            out.push('\n');
        }
        Value::String(string) => {
            out.push(' ');
            out.push_str(&quote(string));
            out.push('\n');
        }
    }
}

/// Double-quote a string scalar, escaping backslash, quote and control
/// characters.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        let Value::Object(object) = value else {
            unreachable!()
        };
        Record::from_object(object).unwrap()
    }

    #[test]
    fn test_encode_preferred_order() {
        let r = record(json!({
            "title": "A Book",
            "zzz-custom": "x",
            "type": "book",
            "id": "doe2020",
            "aaa-custom": "y"
        }));
        let text = encode(&[r]).unwrap();
        let expected = "---\n\
references:\n\
- id: \"doe2020\"\n\
\x20 type: \"book\"\n\
\x20 title: \"A Book\"\n\
\x20 aaa-custom: \"y\"\n\
\x20 zzz-custom: \"x\"\n\
...\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_encode_nested_structures() {
        let r = record(json!({
            "id": "doe2020",
            "author": [{ "family": "Doe", "given": "Jane" }],
            "issued": { "date-parts": [[2020, 1]] }
        }));
        let text = encode(&[r]).unwrap();
        assert!(text.contains("  author:\n    - family: \"Doe\"\n      given: \"Jane\"\n"));
        assert!(text.contains("  issued:\n    date-parts:\n"));
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("a \"b\" \\ c"), r#""a \"b\" \\ c""#);
        assert_eq!(quote("line\nbreak\ttab"), r#""line\nbreak\ttab""#);
        assert_eq!(quote("\u{1}"), r#""\x01""#);
    }

    #[test]
    fn test_round_trip() {
        let records = vec![
            record(json!({
                "id": "doe2020",
                "type": "book",
                "title": "Ideas: A History",
                "author": [{ "family": "Doe", "given": "Jane" }],
                "issued": { "date-parts": [["2020", "01"]] }
            })),
            record(json!({ "id": "smith1999" })),
        ];
        let text = encode(&records).unwrap();
        let again = decode(&text).unwrap();
        assert_eq!(records, again);
    }

    #[test]
    fn test_decode_missing_references_is_empty() {
        assert!(decode("---\nother: 1\n").unwrap().is_empty());
        assert!(decode("---\nreferences:\n...\n").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_non_list_references() {
        assert!(decode("references: 5\n").is_err());
    }
}
