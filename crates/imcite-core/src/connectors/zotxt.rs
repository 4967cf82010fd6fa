//! Direct connector for the local zotxt endpoint
//!
//! zotxt answers keyed lookups over plain HTTP on localhost: one GET per
//! dialect, `?<dialect>=<key>`, a JSON array with exactly one object on a
//! hit. Whichever dialect produced the last hit is tried first for the next
//! key.

use serde_json::{Map, Value};
use tracing::debug;

use super::{finalize_item, Connector, ResolveError};
use crate::citekey::{candidate_dialects, Dialect};
use crate::csl::Record;
use crate::http::{HttpClient, HttpError};

pub const DEFAULT_PORT: u16 = 23119;

pub struct ZotxtConnector {
    client: HttpClient,
    base_url: String,
    dialects: Vec<Dialect>,
}

impl ZotxtConnector {
    pub fn new(port: u16) -> Self {
        Self::with_dialects(port, Dialect::all().to_vec())
    }

    /// Restrict the connector to an allow-list of dialects, in try order.
    pub fn with_dialects(port: u16, dialects: Vec<Dialect>) -> Self {
        Self {
            client: HttpClient::default(),
            base_url: format!("http://localhost:{port}"),
            dialects,
        }
    }

    /// Current dialect try order.
    pub fn dialects(&self) -> &[Dialect] {
        &self.dialects
    }

    /// Move `dialect` to the front of the try order.
    fn promote(&mut self, dialect: Dialect) {
        if let Some(position) = self.dialects.iter().position(|d| *d == dialect) {
            let dialect = self.dialects.remove(position);
            self.dialects.insert(0, dialect);
        }
    }

    /// Classify a response body: a JSON array holding exactly one object is
    /// a hit; anything else is not-found-shaped.
    fn single_item(body: &str) -> Result<Map<String, Value>, String> {
        let items: Vec<Value> =
            serde_json::from_str(body).map_err(|e| format!("invalid JSON: {e}"))?;
        if items.len() != 1 {
            return Err(format!("expected exactly one item, got {}", items.len()));
        }
        let Some(Value::Object(object)) = items.into_iter().next() else {
            return Err("item is not an object".to_string());
        };
        Ok(object)
    }
}

impl Connector for ZotxtConnector {
    fn name(&self) -> &'static str {
        "zotxt"
    }

    fn resolve(&mut self, key: &str) -> Result<Record, ResolveError> {
        let candidates = candidate_dialects(key, &self.dialects);
        let mut last_detail = "no registered dialect matches".to_string();

        for dialect in candidates {
            debug!(dialect = dialect.query_param(), key, "keyed lookup");
            let url = format!("{}/items", self.base_url);
            let response = self
                .client
                .get_with_params(&url, &[(dialect.query_param(), key)])
                .map_err(ResolveError::Connection)?;

            if !response.is_success() {
                last_detail = format!(
                    "{} lookup: HTTP status {}",
                    dialect.query_param(),
                    response.status
                );
                continue;
            }
            match response.expect_content_type("text/plain") {
                Err(e @ HttpError::NonUtf8Charset { .. }) => {
                    return Err(ResolveError::Encoding(e));
                }
                Err(e) => {
                    last_detail = format!("{} lookup: {e}", dialect.query_param());
                    continue;
                }
                Ok(()) => {}
            }
            let body = match response.expect_body() {
                Ok(body) => body,
                Err(e) => {
                    last_detail = format!("{} lookup: {e}", dialect.query_param());
                    continue;
                }
            };
            match Self::single_item(body) {
                Ok(object) => {
                    self.promote(dialect);
                    return finalize_item(key, object);
                }
                Err(detail) => {
                    last_detail = format!("{} lookup: {detail}", dialect.query_param());
                }
            }
        }

        Err(ResolveError::NotFound {
            key: key.to_string(),
            detail: last_detail,
        })
    }
}
