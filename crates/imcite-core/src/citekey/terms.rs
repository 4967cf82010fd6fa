//! Search term derivation from structured citation keys

use lazy_static::lazy_static;
use regex::Regex;

use super::Dialect;

/// Search terms derived from a citation key under a structured dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerms {
    /// Author surname, as written in the key.
    pub author: String,
    /// Four-digit year, when the key carries one.
    pub year: Option<String>,
    /// Title words, in key order.
    pub title: Vec<String>,
}

lazy_static! {
    // Leading run of letters is the author; an optional separator and four
    // digits are the year; everything after is title material.
    static ref STRUCTURED_KEY: Regex =
        Regex::new(r"^(?P<author>[A-Za-z]+)(?:[._:-]?(?P<year>\d{4}))?(?P<rest>.*)$").unwrap();
}

/// Derive search terms from `key` under `dialect`.
///
/// Pure and I/O free. Returns `None` when the key does not parse under the
/// dialect's grammar, e.g. a missing author prefix or an opaque item key.
pub fn search_terms(key: &str, dialect: Dialect) -> Option<SearchTerms> {
    if dialect == Dialect::ItemKey {
        return None;
    }
    let caps = STRUCTURED_KEY.captures(key)?;
    let author = caps.name("author")?.as_str().to_string();
    let year = caps.name("year").map(|m| m.as_str().to_string());
    let title = split_title_words(caps.name("rest").map_or("", |m| m.as_str()));
    Some(SearchTerms {
        author,
        year,
        title,
    })
}

/// Split the title remainder on uppercase-letter boundaries.
///
/// A leading non-uppercase run is kept as the first word fragment:
/// `"fooBarBaz"` becomes `["foo", "Bar", "Baz"]`.
fn split_title_words(rest: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for c in rest.chars() {
        if c.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_author_year_title() {
        let terms = search_terms("doe2020Title", Dialect::BetterBibTex).unwrap();
        assert_eq!(terms.author, "doe");
        assert_eq!(terms.year.as_deref(), Some("2020"));
        assert_eq!(terms.title, vec!["Title"]);
    }

    #[test]
    fn test_separator_before_year() {
        let terms = search_terms("doe:2020title", Dialect::EasyKey).unwrap();
        assert_eq!(terms.author, "doe");
        assert_eq!(terms.year.as_deref(), Some("2020"));
        assert_eq!(terms.title, vec!["title"]);
    }

    #[test]
    fn test_camel_case_title_words() {
        let terms = search_terms("smith1999FirstSteps", Dialect::BetterBibTex).unwrap();
        assert_eq!(terms.title, vec!["First", "Steps"]);
    }

    #[test]
    fn test_leading_lowercase_fragment_kept() {
        assert_eq!(
            split_title_words("fooBarBaz"),
            vec!["foo", "Bar", "Baz"]
        );
    }

    #[test]
    fn test_author_only_key() {
        let terms = search_terms("knuth", Dialect::BetterBibTex).unwrap();
        assert_eq!(terms.author, "knuth");
        assert_eq!(terms.year, None);
        assert!(terms.title.is_empty());
    }

    #[rstest]
    #[case("2020doe")]
    #[case("")]
    #[case("_doe2020")]
    fn test_missing_author_prefix(#[case] key: &str) {
        assert_eq!(search_terms(key, Dialect::BetterBibTex), None);
    }

    #[test]
    fn test_item_key_dialect_yields_no_terms() {
        assert_eq!(search_terms("doe2020Title", Dialect::ItemKey), None);
    }

    #[test]
    fn test_short_digit_run_is_title_material() {
        let terms = search_terms("doe20x", Dialect::BetterBibTex).unwrap();
        assert_eq!(terms.author, "doe");
        assert_eq!(terms.year, None);
        assert_eq!(terms.title, vec!["20x"]);
    }
}
