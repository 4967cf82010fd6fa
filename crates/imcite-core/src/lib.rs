//! imcite-core: citation key resolution and bibliography caching
//!
//! This library resolves the citation keys used in a document against a
//! reference manager and caches the resolved records across runs:
//! - Citation key dialect classification and search term derivation
//! - CSL-style record normalization and note-encoded extra fields
//! - Connectors for the local zotxt endpoint and the Zotero web API
//! - Suffix-selected bibliography codecs (JSON, YAML, read-only BibTeX)
//! - A resolution driver that merges results into a cache file or into
//!   inline document metadata
//!
//! The host document pipeline supplies the keys used in a document and the
//! keys it already defines; everything else happens here.

pub mod citekey;
pub mod config;
pub mod connectors;
pub mod csl;
pub mod http;
pub mod resolve;
pub mod storage;

// Re-export main types for convenience
pub use citekey::{candidate_dialects, search_terms, Dialect, SearchTerms};
pub use config::ResolverOptions;
pub use connectors::{
    Ambiguity, Connector, ConnectorChain, KeyFailure, ResolveError, ZoteroConnector,
    ZotxtConnector,
};
pub use csl::{normalize_field_name, DateParseError, FieldNameError, Record};
pub use http::{HttpClient, HttpError, HttpResponse};
pub use resolve::{resolve_document, Resolution};
pub use storage::{BibStore, Codec, StoreError, UpdateError, UpdateOutcome};
