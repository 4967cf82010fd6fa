//! Format-pluggable persistence for resolved records
//!
//! A bibliography cache is a flat file of records keyed by citation key.
//! The codec is chosen by filename suffix; adding a format means
//! registering another codec, not touching the store logic.

pub mod bibtex;
pub mod json;
pub mod yaml;

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::connectors::{Connector, KeyFailure};
use crate::csl::Record;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("'{path}' has no filename suffix")]
    NoSuffix { path: String },
    #[error("no codec registered for '.{suffix}'")]
    UnsupportedFormat { suffix: String },
    #[error("bibliography '{path}' not found")]
    NotFound { path: String },
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write '{path}': {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse '{path}': {message}")]
    Parse { path: String, message: String },
    #[error("failed to encode '{path}': {message}")]
    Encode { path: String, message: String },
}

/// Errors out of a cache update: either the store itself failed, or a
/// connector reported a fatal (connection-level) failure.
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Resolve(#[from] crate::connectors::ResolveError),
}

/// One suffix-selected encode/decode pair.
///
/// `encode` is `None` for read-only formats.
pub struct Codec {
    pub suffixes: &'static [&'static str],
    pub decode: fn(&str) -> Result<Vec<Record>, String>,
    pub encode: Option<fn(&[Record]) -> Result<String, String>>,
}

/// Outcome of a cache update.
#[derive(Debug)]
pub struct UpdateOutcome {
    /// Full record set after the update: pre-existing plus appended.
    pub records: Vec<Record>,
    /// How many records were appended this run.
    pub added: usize,
    /// Per-key failures that did not abort the batch.
    pub failures: Vec<KeyFailure>,
}

/// Codec registry plus the cache update algorithm.
pub struct BibStore {
    codecs: Vec<Codec>,
}

impl Default for BibStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BibStore {
    /// Registry with the standard codecs: `json`, `yaml`/`yml` and the
    /// read-only `bib`/`bibtex`.
    pub fn new() -> Self {
        Self {
            codecs: vec![json::codec(), yaml::codec(), bibtex::codec()],
        }
    }

    /// Register an additional codec. Later registrations win on suffix
    /// conflicts.
    pub fn register(&mut self, codec: Codec) {
        self.codecs.insert(0, codec);
    }

    fn codec_for(&self, path: &Path) -> Result<(String, &Codec), StoreError> {
        let suffix = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| StoreError::NoSuffix {
                path: path.display().to_string(),
            })?
            .to_ascii_lowercase();
        let codec = self
            .codecs
            .iter()
            .find(|codec| codec.suffixes.contains(&suffix.as_str()))
            .ok_or_else(|| StoreError::UnsupportedFormat {
                suffix: suffix.clone(),
            })?;
        Ok((suffix, codec))
    }

    /// Decode all records in the bibliography at `path`.
    ///
    /// A missing file is [`StoreError::NotFound`], distinct from parse
    /// errors.
    pub fn read(&self, path: &Path) -> Result<Vec<Record>, StoreError> {
        let (_, codec) = self.codec_for(path)?;
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    path: path.display().to_string(),
                })
            }
            Err(e) => {
                return Err(StoreError::Read {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };
        (codec.decode)(&text).map_err(|message| StoreError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    /// Encode `records` and atomically replace the file at `path`.
    ///
    /// The replacement goes through a sibling temporary file and a rename,
    /// so a reader never observes a partial write. An empty record set
    /// returns without touching the filesystem.
    pub fn write(&self, path: &Path, records: &[Record]) -> Result<(), StoreError> {
        let (suffix, codec) = self.codec_for(path)?;
        let Some(encode) = codec.encode else {
            return Err(StoreError::UnsupportedFormat { suffix });
        };
        if records.is_empty() {
            return Ok(());
        }
        let text = encode(records).map_err(|message| StoreError::Encode {
            path: path.display().to_string(),
            message,
        })?;

        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let io_error = |source| StoreError::Write {
            path: path.display().to_string(),
            source,
        };
        let mut staged = tempfile::NamedTempFile::new_in(directory).map_err(io_error)?;
        staged.write_all(text.as_bytes()).map_err(io_error)?;
        staged.persist(path).map_err(|e| io_error(e.error))?;
        Ok(())
    }

    /// Fetch records for `keys` that are not yet cached and rewrite the
    /// bibliography once.
    ///
    /// Pre-existing records are never edited or removed. Per-key failures
    /// are collected and the batch continues; a connection-level failure
    /// aborts the whole call with nothing written. When nothing was
    /// appended the file is left untouched.
    pub fn update(
        &self,
        connector: &mut dyn Connector,
        path: &Path,
        keys: &[String],
    ) -> Result<UpdateOutcome, UpdateError> {
        let mut records = match self.read(path) {
            Ok(records) => records,
            Err(StoreError::NotFound { .. }) => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let mut present: HashSet<String> = records
            .iter()
            .filter_map(|record| record.id().map(str::to_string))
            .collect();

        let mut failures = Vec::new();
        let mut added = 0;
        for key in keys {
            if present.contains(key) {
                debug!(key = key.as_str(), "already cached");
                continue;
            }
            match connector.resolve(key) {
                Ok(record) => {
                    present.insert(key.clone());
                    records.push(record);
                    added += 1;
                }
                Err(error) if error.is_fatal() => return Err(error.into()),
                Err(error) => failures.push(KeyFailure {
                    key: key.clone(),
                    error,
                }),
            }
        }

        if added > 0 {
            self.write(path, &records)?;
        }
        Ok(UpdateOutcome {
            records,
            added,
            failures,
        })
    }
}
