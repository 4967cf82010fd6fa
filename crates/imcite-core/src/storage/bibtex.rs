//! Read-only BibTeX codec
//!
//! Bibliography files in BibTeX/BibLaTeX form only contribute the set of
//! citation keys already defined; full records are never decoded from them.

use lazy_static::lazy_static;
use regex::Regex;

use super::Codec;
use crate::csl::Record;

lazy_static! {
    // The cite key is the text inside `@type{` up to the first comma or
    // whitespace.
    static ref ENTRY: Regex = Regex::new(r"@\s*([A-Za-z]+)\s*[({]\s*([^,\s{}()]+)").unwrap();
}

pub fn codec() -> Codec {
    Codec {
        suffixes: &["bib", "bibtex"],
        decode,
        encode: None,
    }
}

fn decode(text: &str) -> Result<Vec<Record>, String> {
    let mut records = Vec::new();
    for caps in ENTRY.captures_iter(text) {
        let entry_type = caps[1].to_ascii_lowercase();
        if matches!(entry_type.as_str(), "string" | "preamble" | "comment") {
            continue;
        }
        let mut record = Record::new();
        record.set_id(&caps[2]);
        records.push(record);
    }
    Ok(records)
}
