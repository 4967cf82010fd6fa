//! Host-facing configuration
//!
//! The document pipeline passes these options through from document
//! metadata or the command line; field names follow the kebab-case spelling
//! the metadata uses.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::warn;

use crate::citekey::Dialect;
use crate::connectors::{zotxt, Connector, ZoteroConnector, ZotxtConnector};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ResolverOptions {
    /// Bibliography cache path; the filename suffix selects the format.
    pub cache_file_path: Option<PathBuf>,
    /// Allow-list restricting the dialects tried, using the wire names
    /// (`betterbibtexkey`, `easykey`, `key`).
    pub key_dialects: Option<Vec<String>>,
    /// Zotero web API key; enables the search connector.
    pub remote_account_key: Option<String>,
    /// Zotero account id; discovered from the API key when absent.
    pub remote_account_id: Option<u64>,
    /// Port of the local zotxt endpoint.
    pub zotxt_port: Option<u16>,
}

impl ResolverOptions {
    /// The dialect allow-list, or every dialect when unrestricted. Unknown
    /// names are skipped with a warning.
    pub fn dialects(&self) -> Vec<Dialect> {
        let Some(names) = &self.key_dialects else {
            return Dialect::all().to_vec();
        };
        names
            .iter()
            .filter_map(|name| {
                let dialect = Dialect::from_name(name);
                if dialect.is_none() {
                    warn!(name = name.as_str(), "unknown citation key dialect");
                }
                dialect
            })
            .collect()
    }

    /// Build the connector set in priority order: the local endpoint first,
    /// the web API as fallback when an account key is configured.
    pub fn connectors(&self) -> Vec<Box<dyn Connector>> {
        let mut connectors: Vec<Box<dyn Connector>> = vec![Box::new(
            ZotxtConnector::with_dialects(
                self.zotxt_port.unwrap_or(zotxt::DEFAULT_PORT),
                self.dialects(),
            ),
        )];
        if let Some(api_key) = &self.remote_account_key {
            connectors.push(Box::new(
                ZoteroConnector::new(api_key, self.remote_account_id)
                    .restrict_dialects(self.dialects()),
            ));
        }
        connectors
    }
}
