//! Blocking HTTP client shared by the connectors
//!
//! Resolution is a sequential pass, so the client blocks with an explicit
//! per-request deadline. Response-shape problems (content type, charset,
//! empty body) are distinguishable error kinds rather than a generic parse
//! failure.

use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("request failed: {message}")]
    RequestFailed { message: String },
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
    #[error("request timed out")]
    Timeout,
    #[error("HTTP status {status}")]
    Status { status: u16 },
    #[error("response carries no content type")]
    MissingContentType,
    #[error("unexpected content type '{content_type}'")]
    WrongContentType { content_type: String },
    #[error("response charset is not UTF-8: '{charset}'")]
    NonUtf8Charset { charset: String },
    #[error("empty response body")]
    EmptyBody,
}

/// A fully buffered response.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Enforce the expected MIME type and, when a charset parameter is
    /// present, that it names UTF-8.
    pub fn expect_content_type(&self, expected: &str) -> Result<(), HttpError> {
        let Some(content_type) = self.content_type.as_deref() else {
            return Err(HttpError::MissingContentType);
        };
        let mut parts = content_type.split(';');
        let mime = parts.next().unwrap_or("").trim();
        if !mime.eq_ignore_ascii_case(expected) {
            return Err(HttpError::WrongContentType {
                content_type: content_type.to_string(),
            });
        }
        for parameter in parts {
            if let Some((name, value)) = parameter.split_once('=') {
                if name.trim().eq_ignore_ascii_case("charset") {
                    let charset = value.trim().trim_matches('"');
                    if !charset.eq_ignore_ascii_case("utf-8") {
                        return Err(HttpError::NonUtf8Charset {
                            charset: charset.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Reject an empty (or whitespace-only) body.
    pub fn expect_body(&self) -> Result<&str, HttpError> {
        if self.body.trim().is_empty() {
            return Err(HttpError::EmptyBody);
        }
        Ok(&self.body)
    }
}

pub struct HttpClient {
    client: Client,
    user_agent: String,
}

impl HttpClient {
    pub fn new(user_agent: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            user_agent: user_agent.to_string(),
        }
    }

    pub fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    HttpError::Timeout
                } else {
                    HttpError::RequestFailed {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().map_err(|e| HttpError::RequestFailed {
            message: e.to_string(),
        })?;

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }

    pub fn get_with_params(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<HttpResponse, HttpError> {
        let url = Url::parse_with_params(url, params).map_err(|_| HttpError::InvalidUrl {
            url: url.to_string(),
        })?;
        self.get(url.as_str())
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(concat!("imcite/", env!("CARGO_PKG_VERSION")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(content_type: Option<&str>, body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            content_type: content_type.map(str::to_string),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_content_type_match() {
        let r = response(Some("text/plain; charset=UTF-8"), "[]");
        assert!(r.expect_content_type("text/plain").is_ok());
    }

    #[test]
    fn test_content_type_missing() {
        let r = response(None, "[]");
        assert!(matches!(
            r.expect_content_type("text/plain"),
            Err(HttpError::MissingContentType)
        ));
    }

    #[test]
    fn test_content_type_wrong() {
        let r = response(Some("text/html"), "[]");
        assert!(matches!(
            r.expect_content_type("text/plain"),
            Err(HttpError::WrongContentType { .. })
        ));
    }

    #[test]
    fn test_content_type_bad_charset() {
        let r = response(Some("text/plain; charset=latin1"), "[]");
        assert!(matches!(
            r.expect_content_type("text/plain"),
            Err(HttpError::NonUtf8Charset { .. })
        ));
    }

    #[test]
    fn test_empty_body() {
        let r = response(Some("text/plain"), "  \n");
        assert!(matches!(r.expect_body(), Err(HttpError::EmptyBody)));
    }
}
