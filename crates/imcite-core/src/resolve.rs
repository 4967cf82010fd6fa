//! Document-level resolution driver
//!
//! The host pipeline hands over the citation keys used in a document and
//! the keys it already defines; the driver resolves the rest and merges
//! them into a bibliography cache or into inline records. Per-key failures
//! are reported, not fatal; a connection failure aborts the run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::connectors::{Connector, ConnectorChain, KeyFailure};
use crate::csl::Record;
use crate::storage::{BibStore, UpdateError};

/// Result of one document resolution pass.
#[derive(Debug)]
pub struct Resolution {
    /// Bibliography file the host should reference, when caching is on.
    pub bibliography: Option<PathBuf>,
    /// Full record set: the updated cache contents, or the records to
    /// append to the document's inline metadata.
    pub records: Vec<Record>,
    /// Keys that did not resolve, with the reason each failed.
    pub failures: Vec<KeyFailure>,
}

/// Resolve every undefined citation key in `requested_keys`.
///
/// With a `cache_path` the keys are routed through the cache store and the
/// host is pointed at the file; otherwise resolved records are returned for
/// inline metadata. Connectors are tried in slice order per key; a key
/// resolved by one connector is not retried with another.
pub fn resolve_document(
    store: &BibStore,
    connectors: &mut [Box<dyn Connector>],
    existing_keys: &HashSet<String>,
    requested_keys: &[String],
    cache_path: Option<&Path>,
) -> Result<Resolution, UpdateError> {
    let keys = undefined_keys(existing_keys, requested_keys);
    let mut chain = ConnectorChain::new(connectors);

    let resolution = match cache_path {
        Some(path) => {
            let outcome = store.update(&mut chain, path, &keys)?;
            Resolution {
                bibliography: Some(path.to_path_buf()),
                records: outcome.records,
                failures: outcome.failures,
            }
        }
        None => resolve_inline(&mut chain, &keys)?,
    };

    for failure in &resolution.failures {
        warn!(key = failure.key.as_str(), "failed to resolve: {}", failure.error);
    }
    Ok(resolution)
}

/// Deduplicate `requested`, preserving first-seen order, and drop keys the
/// document already defines.
fn undefined_keys(existing: &HashSet<String>, requested: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    requested
        .iter()
        .filter(|key| !existing.contains(*key) && seen.insert((*key).clone()))
        .cloned()
        .collect()
}

fn resolve_inline(
    chain: &mut ConnectorChain<'_>,
    keys: &[String],
) -> Result<Resolution, UpdateError> {
    let mut records = Vec::new();
    let mut failures = Vec::new();
    for key in keys {
        match chain.resolve(key) {
            Ok(record) => records.push(record),
            Err(error) if error.is_fatal() => return Err(error.into()),
            Err(error) => failures.push(KeyFailure {
                key: key.clone(),
                error,
            }),
        }
    }
    Ok(Resolution {
        bibliography: None,
        records,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(keys: &[&str]) -> HashSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    fn list(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_undefined_keys_preserves_order_and_dedups() {
        let existing = set(&["known"]);
        let requested = list(&["b", "known", "a", "b", "c", "a"]);
        assert_eq!(
            undefined_keys(&existing, &requested),
            list(&["b", "a", "c"])
        );
    }

    #[test]
    fn test_undefined_keys_empty_when_all_defined() {
        let existing = set(&["a", "b"]);
        assert!(undefined_keys(&existing, &list(&["a", "b"])).is_empty());
    }
}
