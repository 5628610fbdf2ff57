//! Single HTTP-request helper shared by both downloader adapters.
//!
//! Builds query strings, request bodies (JSON / form / multipart) and basic
//! auth headers, then parses the response as JSON when possible, falling
//! back to the raw text. Transport failures surface as [`RequestError`] and
//! are normalized by the adapters — nothing here panics or retries.

use reqwest::multipart;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Default per-request timeout. Probing nonexistent hosts during endpoint
/// discovery must not hang for the reqwest default.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect timeout for the shared client, bounded tighter than the full
/// request timeout so unreachable hosts fail fast.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared client for the adapters, built with the connect timeout applied.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("HTTP request failed with status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Request body variants used across the two backend protocols.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body (SABnzbd's query-style GET API).
    #[default]
    None,
    /// JSON body (NZBGet's JSON-RPC envelope).
    Json(Value),
    /// URL-encoded form fields.
    Form(Vec<(String, String)>),
    /// Multipart upload: text fields plus one file part
    /// (SABnzbd `addfile`).
    Multipart {
        fields: Vec<(String, String)>,
        file_field: String,
        filename: String,
        content: Vec<u8>,
    },
}

/// One HTTP exchange, fully described.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: reqwest::Method,
    pub url: String,
    /// Query parameters, appended in order.
    pub params: Vec<(String, String)>,
    pub body: RequestBody,
    /// HTTP basic auth, used by NZBGet (and optionally by SABnzbd behind
    /// an authenticated reverse proxy).
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl RequestOptions {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(reqwest::Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(reqwest::Method::POST, url)
    }

    fn new(method: reqwest::Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Vec::new(),
            body: RequestBody::None,
            username: None,
            password: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn params(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.params.extend(pairs);
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn basic_auth(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }
}

/// Issues the request and decodes the response.
///
/// Returns the parsed JSON value, or `Value::String` with the raw body for
/// non-JSON responses (SABnzbd returns bare text for some error cases).
pub async fn send_request(client: &reqwest::Client, opts: RequestOptions) -> Result<Value, RequestError> {
    log::debug!("{} {} ({} params)", opts.method, opts.url, opts.params.len());

    let mut req = client
        .request(opts.method, &opts.url)
        .timeout(opts.timeout);

    if !opts.params.is_empty() {
        req = req.query(&opts.params);
    }
    if let Some(username) = &opts.username {
        req = req.basic_auth(username, opts.password.as_deref());
    }

    req = match opts.body {
        RequestBody::None => req,
        RequestBody::Json(value) => req.json(&value),
        RequestBody::Form(fields) => req.form(&fields),
        RequestBody::Multipart {
            fields,
            file_field,
            filename,
            content,
        } => {
            let mut form = multipart::Form::new();
            for (key, value) in fields {
                form = form.text(key, value);
            }
            let part = multipart::Part::bytes(content).file_name(filename);
            form = form.part(file_field, part);
            req.multipart(form)
        }
    };

    let response = req.send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(RequestError::Status {
            status: status.as_u16(),
            body: text,
        });
    }

    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_options_builder() {
        let opts = RequestOptions::get("http://localhost:8080/api")
            .param("mode", "queue")
            .param("output", "json")
            .basic_auth(Some("user".into()), Some("pass".into()));

        assert_eq!(opts.method, reqwest::Method::GET);
        assert_eq!(opts.params.len(), 2);
        assert_eq!(opts.params[0], ("mode".to_string(), "queue".to_string()));
        assert_eq!(opts.username.as_deref(), Some("user"));
        assert_eq!(opts.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_http_client_builds() {
        let _ = http_client();
        assert!(CONNECT_TIMEOUT < DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_default_body_is_none() {
        let opts = RequestOptions::post("http://localhost:6789/jsonrpc");
        assert!(matches!(opts.body, RequestBody::None));
    }
}
