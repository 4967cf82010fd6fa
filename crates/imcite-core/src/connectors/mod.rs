//! Connector plugins that resolve citation keys against a reference manager
//!
//! Both connectors implement the same capability: `resolve(key)` returns the
//! normalized record for one citation key. The direct connector issues keyed
//! lookups against a local zotxt endpoint; the search connector drives the
//! Zotero web API through endpoint discovery, search and disambiguation.

pub mod zotero;
pub mod zotxt;

pub use zotero::ZoteroConnector;
pub use zotxt::ZotxtConnector;

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::csl::{apply_extras, FieldNameError, Record};
use crate::http::HttpError;

/// Why disambiguation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ambiguity {
    /// Several search hits, none carrying a matching citation key note.
    NoMatchingItems,
    /// The citation key is assigned to more than one item.
    MultipleMatchingItems,
}

impl fmt::Display for Ambiguity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ambiguity::NoMatchingItems => write!(f, "matches no items"),
            Ambiguity::MultipleMatchingItems => write!(f, "is assigned to more than one item"),
        }
    }
}

/// Resolution failure for a single citation key.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Transport-level failure. Fatal: the network is assumed down for every
    /// remaining key in the batch.
    #[error("connection failed: {0}")]
    Connection(#[source] HttpError),
    /// The response body is not UTF-8 text.
    #[error("response is not UTF-8: {0}")]
    Encoding(#[source] HttpError),
    /// The response shape is wrong (content type, empty body).
    #[error("unexpected response: {0}")]
    Response(#[source] HttpError),
    #[error("malformed response body: {message}")]
    Parse { message: String },
    #[error("no item found for '{key}': {detail}")]
    NotFound { key: String, detail: String },
    #[error("citation key '{key}' {ambiguity}")]
    Ambiguous { key: String, ambiguity: Ambiguity },
    #[error(transparent)]
    Field(#[from] FieldNameError),
}

impl ResolveError {
    /// Fatal errors abort the in-flight batch; everything else is reported
    /// per key and the batch continues.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ResolveError::Connection(_))
    }
}

impl From<HttpError> for ResolveError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::NonUtf8Charset { .. } => ResolveError::Encoding(e),
            HttpError::MissingContentType
            | HttpError::WrongContentType { .. }
            | HttpError::EmptyBody => ResolveError::Response(e),
            _ => ResolveError::Connection(e),
        }
    }
}

/// A resolution failure attached to the key that caused it.
#[derive(Debug)]
pub struct KeyFailure {
    pub key: String,
    pub error: ResolveError,
}

/// Resolves one citation key into a normalized record.
///
/// Connectors are stateful in the optimization sense only: the direct
/// connector reorders its dialect try-list, the search connector caches its
/// discovered endpoints. Neither is safe to share across threads without a
/// mutex.
pub trait Connector {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Resolve `key` to a record whose `id` equals `key`.
    fn resolve(&mut self, key: &str) -> Result<Record, ResolveError>;
}

/// Tries a fixed priority order of connectors for each key.
///
/// The first success wins and later connectors are not consulted for that
/// key; a fatal error stops the chain immediately.
pub struct ConnectorChain<'a> {
    connectors: &'a mut [Box<dyn Connector>],
}

impl<'a> ConnectorChain<'a> {
    pub fn new(connectors: &'a mut [Box<dyn Connector>]) -> Self {
        Self { connectors }
    }
}

impl Connector for ConnectorChain<'_> {
    fn name(&self) -> &'static str {
        "chain"
    }

    fn resolve(&mut self, key: &str) -> Result<Record, ResolveError> {
        let mut last = None;
        for connector in self.connectors.iter_mut() {
            match connector.resolve(key) {
                Ok(record) => return Ok(record),
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    debug!(connector = connector.name(), key, "no hit: {error}");
                    last = Some(error);
                }
            }
        }
        Err(last.unwrap_or_else(|| ResolveError::NotFound {
            key: key.to_string(),
            detail: "no connectors configured".to_string(),
        }))
    }
}

/// Normalize a fetched item, fold in its note-encoded extras and force the
/// record identity to the citation key that produced it.
pub(crate) fn finalize_item(key: &str, object: Map<String, Value>) -> Result<Record, ResolveError> {
    let record = Record::from_object(object)?;
    let (mut record, extras_errors) = apply_extras(&record);
    for error in extras_errors {
        warn!(key, "bad extra field: {error}");
    }
    record.set_id(key);
    Ok(record)
}
