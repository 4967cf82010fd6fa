//! Citation key dialects and classification
//!
//! A citation key found in a document can be written under more than one
//! grammar ("dialect"). Classification is pure string inspection; which
//! dialect actually matches an item in the reference manager is decided at
//! resolution time by trying each candidate in turn.

pub mod terms;

pub use terms::{search_terms, SearchTerms};

/// One grammar family a citation key can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Better BibTeX keys: author, year, camel-cased title words
    /// (`doe2020FirstSteps`).
    BetterBibTex,
    /// Easy keys: author, `:` separator, year and a lowercased title
    /// fragment (`doe:2020first`).
    EasyKey,
    /// Native item keys: exactly eight characters from `[A-Z0-9]`.
    ItemKey,
}

impl Dialect {
    /// All dialects, in the default try order.
    pub fn all() -> &'static [Dialect] {
        &[Dialect::BetterBibTex, Dialect::EasyKey, Dialect::ItemKey]
    }

    /// Query parameter name this dialect uses on the wire.
    pub fn query_param(&self) -> &'static str {
        match self {
            Dialect::BetterBibTex => "betterbibtexkey",
            Dialect::EasyKey => "easykey",
            Dialect::ItemKey => "key",
        }
    }

    /// Inverse of [`Dialect::query_param`]; configuration allow-lists use
    /// the wire names.
    pub fn from_name(name: &str) -> Option<Dialect> {
        match name {
            "betterbibtexkey" => Some(Dialect::BetterBibTex),
            "easykey" => Some(Dialect::EasyKey),
            "key" => Some(Dialect::ItemKey),
            _ => None,
        }
    }

    /// Whether `key` is well-formed under this dialect's grammar.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Dialect::ItemKey => is_item_key(key),
            _ => search_terms(key, *self).is_some(),
        }
    }
}

/// Native item keys are exactly eight characters from `[A-Z0-9]`.
pub fn is_item_key(key: &str) -> bool {
    key.len() == 8
        && key
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// The subset of `registered` dialects `key` qualifies for, in registration
/// order.
///
/// A key may qualify for several dialects at once; resolution tries each in
/// turn.
pub fn candidate_dialects(key: &str, registered: &[Dialect]) -> Vec<Dialect> {
    registered
        .iter()
        .copied()
        .filter(|dialect| dialect.matches(key))
        .collect()
}
