//! Search connector for the Zotero web API
//!
//! Resolution is two-phase: discover the account's item endpoints once per
//! instance (user library plus group libraries), then either look an item
//! key up directly or search with terms derived from the citation key and
//! disambiguate on `citation key:` note lines.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::{finalize_item, Ambiguity, Connector, ResolveError};
use crate::citekey::{is_item_key, search_terms, Dialect};
use crate::csl::Record;
use crate::http::{HttpClient, HttpError};

pub const BASE_URL: &str = "https://api.zotero.org";
const CSL_JSON_MIME: &str = "application/vnd.citationstyles.csl+json";

/// Dialects tried, in preference order, when deriving search terms.
const SEARCH_DIALECTS: &[Dialect] = &[Dialect::BetterBibTex, Dialect::EasyKey];

#[derive(Debug, Deserialize)]
struct KeyInfo {
    #[serde(rename = "userID")]
    user_id: u64,
}

#[derive(Debug, Deserialize)]
struct Group {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct ItemsBody {
    items: Vec<Value>,
}

lazy_static! {
    // Label is case-insensitive; the key itself is compared exactly.
    static ref CITE_KEY_LINE: Regex =
        Regex::new(r"(?im)^\s*(?:citation key|citekey)\s*:\s*(\S+)\s*$").unwrap();
}

pub struct ZoteroConnector {
    client: HttpClient,
    base_url: String,
    api_key: String,
    user_id: Option<u64>,
    dialects: Vec<Dialect>,
    endpoints: Option<Vec<String>>,
}

impl ZoteroConnector {
    pub fn new(api_key: &str, user_id: Option<u64>) -> Self {
        Self::with_base_url(BASE_URL, api_key, user_id)
    }

    pub fn with_base_url(base_url: &str, api_key: &str, user_id: Option<u64>) -> Self {
        Self {
            client: HttpClient::default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            user_id,
            dialects: Dialect::all().to_vec(),
            endpoints: None,
        }
    }

    /// Restrict the connector to an allow-list of dialects.
    pub fn restrict_dialects(mut self, dialects: Vec<Dialect>) -> Self {
        self.dialects = dialects;
        self
    }

    /// Item endpoint prefixes for the account, resolved once per instance.
    fn endpoints(&mut self) -> Result<Vec<String>, ResolveError> {
        if let Some(endpoints) = &self.endpoints {
            return Ok(endpoints.clone());
        }
        let user_id = match self.user_id {
            Some(id) => id,
            None => self.discover_user_id()?,
        };
        self.user_id = Some(user_id);
        let mut endpoints = vec![format!("{}/users/{}", self.base_url, user_id)];
        for group in self.list_groups(user_id)? {
            endpoints.push(format!("{}/groups/{}", self.base_url, group));
        }
        debug!(count = endpoints.len(), "resolved item endpoints");
        self.endpoints = Some(endpoints.clone());
        Ok(endpoints)
    }

    fn discover_user_id(&self) -> Result<u64, ResolveError> {
        let url = format!("{}/keys/{}", self.base_url, self.api_key);
        let response = self
            .client
            .get_with_params(&url, &[("v", "3")])
            .map_err(ResolveError::Connection)?;
        if !response.is_success() {
            return Err(ResolveError::Connection(HttpError::Status {
                status: response.status,
            }));
        }
        let body = response.expect_body()?;
        let info: KeyInfo = serde_json::from_str(body).map_err(|e| ResolveError::Parse {
            message: format!("key info: {e}"),
        })?;
        Ok(info.user_id)
    }

    /// Group libraries visible to the account. A 404 means the account has
    /// none.
    fn list_groups(&self, user_id: u64) -> Result<Vec<u64>, ResolveError> {
        let url = format!("{}/users/{}/groups", self.base_url, user_id);
        let response = self
            .client
            .get_with_params(&url, &[("v", "3"), ("key", self.api_key.as_str())])
            .map_err(ResolveError::Connection)?;
        if response.status == 404 {
            return Ok(Vec::new());
        }
        if !response.is_success() {
            return Err(ResolveError::Connection(HttpError::Status {
                status: response.status,
            }));
        }
        let body = response.expect_body()?;
        let groups: Vec<Group> = serde_json::from_str(body).map_err(|e| ResolveError::Parse {
            message: format!("group listing: {e}"),
        })?;
        Ok(groups.into_iter().map(|g| g.id).collect())
    }

    /// Query one endpoint for items; a 404 pools as zero items.
    fn fetch_items(
        &self,
        endpoint: &str,
        extra: &[(&str, &str)],
    ) -> Result<Vec<Value>, ResolveError> {
        let url = format!("{endpoint}/items");
        let mut params = vec![
            ("v", "3"),
            ("key", self.api_key.as_str()),
            ("format", "csljson"),
        ];
        params.extend_from_slice(extra);
        let response = self
            .client
            .get_with_params(&url, &params)
            .map_err(ResolveError::Connection)?;
        if response.status == 404 {
            return Ok(Vec::new());
        }
        if !response.is_success() {
            return Err(ResolveError::Connection(HttpError::Status {
                status: response.status,
            }));
        }
        response.expect_content_type(CSL_JSON_MIME)?;
        let body = response.expect_body()?;
        let body: ItemsBody = serde_json::from_str(body).map_err(|e| ResolveError::Parse {
            message: format!("item listing: {e}"),
        })?;
        Ok(body.items)
    }

    /// Direct lookup by native item key, pooled across endpoints.
    fn lookup_item_key(&mut self, key: &str) -> Result<Record, ResolveError> {
        let mut pooled = Vec::new();
        for endpoint in self.endpoints()? {
            pooled.extend(self.fetch_items(&endpoint, &[("itemKey", key)])?);
        }
        match pooled.len() {
            0 => Err(ResolveError::NotFound {
                key: key.to_string(),
                detail: "no item with this key".to_string(),
            }),
            1 => finalize_item(key, item_object(key, pooled.remove(0))?),
            _ => Err(ResolveError::Ambiguous {
                key: key.to_string(),
                ambiguity: Ambiguity::MultipleMatchingItems,
            }),
        }
    }

    /// Heuristic search with terms derived from the key, pooled across
    /// endpoints and disambiguated on citation key note lines.
    fn search(&mut self, key: &str) -> Result<Record, ResolveError> {
        let Some(terms) = SEARCH_DIALECTS
            .iter()
            .copied()
            .filter(|dialect| self.dialects.contains(dialect))
            .find_map(|dialect| search_terms(key, dialect))
        else {
            return Err(ResolveError::NotFound {
                key: key.to_string(),
                detail: "no dialect yields search terms".to_string(),
            });
        };
        let mut words = vec![terms.author.clone()];
        words.extend(terms.year.iter().cloned());
        words.extend(terms.title.iter().cloned());
        let query = words.join(" ");
        debug!(key, query = query.as_str(), "searching");

        let mut pooled = Vec::new();
        for endpoint in self.endpoints()? {
            pooled.extend(
                self.fetch_items(
                    &endpoint,
                    &[("qmode", "titleCreatorYear"), ("q", query.as_str())],
                )?,
            );
        }
        match pooled.len() {
            0 => Err(ResolveError::NotFound {
                key: key.to_string(),
                detail: "no search results".to_string(),
            }),
            1 => finalize_item(key, item_object(key, pooled.remove(0))?),
            _ => finalize_item(key, item_object(key, disambiguate(key, pooled)?)?),
        }
    }
}

impl Connector for ZoteroConnector {
    fn name(&self) -> &'static str {
        "zotero"
    }

    fn resolve(&mut self, key: &str) -> Result<Record, ResolveError> {
        if self.dialects.contains(&Dialect::ItemKey) && is_item_key(key) {
            self.lookup_item_key(key)
        } else {
            self.search(key)
        }
    }
}

/// Pick the single item whose note assigns it `key`.
fn disambiguate(key: &str, pooled: Vec<Value>) -> Result<Value, ResolveError> {
    let mut matching: Vec<Value> = pooled
        .into_iter()
        .filter(|item| {
            let note = item.get("note").and_then(Value::as_str).unwrap_or("");
            CITE_KEY_LINE
                .captures_iter(note)
                .any(|caps| &caps[1] == key)
        })
        .collect();
    match matching.len() {
        0 => Err(ResolveError::Ambiguous {
            key: key.to_string(),
            ambiguity: Ambiguity::NoMatchingItems,
        }),
        1 => Ok(matching.remove(0)),
        _ => Err(ResolveError::Ambiguous {
            key: key.to_string(),
            ambiguity: Ambiguity::MultipleMatchingItems,
        }),
    }
}

fn item_object(key: &str, item: Value) -> Result<Map<String, Value>, ResolveError> {
    match item {
        Value::Object(object) => Ok(object),
        _ => Err(ResolveError::Parse {
            message: format!("item for '{key}' is not an object"),
        }),
    }
}
