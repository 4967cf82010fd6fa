//! Author-like name handling for note extras

use serde_json::{json, Value};

/// Parse a single personal name into a CSL name object.
///
/// Handles both `"Family, Given"` and `"Given Family"`; a bare single token
/// becomes a family name alone.
pub fn parse_name(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Some((family, given)) = trimmed.split_once(',') {
        let given = given.trim();
        if given.is_empty() {
            return json!({ "family": family.trim() });
        }
        return json!({ "family": family.trim(), "given": given });
    }
    match trimmed.rsplit_once(char::is_whitespace) {
        Some((given, family)) => json!({ "family": family.trim(), "given": given.trim() }),
        None => json!({ "family": trimmed }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_family_comma_given() {
        assert_eq!(
            parse_name("Doe, Jane"),
            json!({ "family": "Doe", "given": "Jane" })
        );
    }

    #[test]
    fn test_given_family() {
        assert_eq!(
            parse_name("Jane Doe"),
            json!({ "family": "Doe", "given": "Jane" })
        );
    }

    #[test]
    fn test_multi_word_given() {
        assert_eq!(
            parse_name("Jane Q. Doe"),
            json!({ "family": "Doe", "given": "Jane Q." })
        );
    }

    #[test]
    fn test_single_token() {
        assert_eq!(parse_name("Aristotle"), json!({ "family": "Aristotle" }));
    }

    #[test]
    fn test_trailing_comma() {
        assert_eq!(parse_name("Doe,"), json!({ "family": "Doe" }));
    }
}
