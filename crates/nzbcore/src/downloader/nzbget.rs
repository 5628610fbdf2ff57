//! NZBGet adapter.
//!
//! NZBGet speaks JSON-RPC over HTTP POST: `{"method": ..., "params": [...]}`
//! with positional params and HTTP basic auth. Responses carry the usual
//! envelope (`result` on success, non-null `error` on failure). Queue state
//! is assembled from two calls, `status` and `listgroups`, and file content
//! travels base64-encoded inside the `append` tuple.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::downloader::models::{
    normalize_status, AddNzbOptions, DownloaderType, NzbAddUrlResult, NzbQueue, NzbQueueItem,
    NzbResult,
};
use crate::downloader::traits::{CallParams, Downloader};
use crate::error::{NzbError, Result};
use crate::options::DownloaderOptions;
use crate::request::{http_client, send_request, RequestBody, RequestError, RequestOptions};
use crate::units;

/// NZBGet has no first-class category listing; categories are read out of
/// the server config as `Category1.Name`, `Category2.Name`, ...
#[allow(clippy::expect_used)]
static CATEGORY_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Category\d+\.Name$").expect("static pattern"));

#[derive(Clone)]
pub struct NzbgetClient {
    name: String,
    api_url: String,
    username: Option<String>,
    password: Option<String>,
    client: reqwest::Client,
}

impl NzbgetClient {
    pub fn new(options: &DownloaderOptions) -> Result<Self> {
        let api_url = options.api_url.trim().trim_end_matches('/').to_string();
        if api_url.is_empty() {
            return Err(NzbError::Config(format!(
                "downloader '{}' has no API URL",
                options.name
            )));
        }
        Ok(Self {
            name: options.name.clone(),
            api_url,
            username: options.username.clone(),
            password: options.password.clone(),
            client: http_client(),
        })
    }

    /// One JSON-RPC round trip, with the envelope unwrapped.
    async fn rpc(&self, method: &str, params: Vec<Value>) -> NzbResult {
        let body = json!({ "method": method, "params": params });
        let opts = RequestOptions::post(&self.api_url)
            .body(RequestBody::Json(body))
            .basic_auth(self.username.clone(), self.password.clone());
        let value = match send_request(&self.client, opts).await {
            Ok(value) => value,
            Err(RequestError::Status { status: 401, .. }) => {
                return NzbResult::fail(method, "authentication failed (check username/password)");
            }
            Err(e) => return NzbResult::fail(method, e.to_string()),
        };
        if let Some(error) = value.get("error") {
            if !error.is_null() {
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());
                return NzbResult::fail(method, message);
            }
        }
        NzbResult::ok(method, value.get("result").cloned().unwrap_or(Value::Null))
    }

    /// The fixed-arity `append` tuple shared by `add_url` and `add_file`;
    /// only the content slot differs (a URL or base64-encoded NZB data).
    fn append_params(nzb_name: &str, content: &str, options: &AddNzbOptions) -> Vec<Value> {
        vec![
            json!(nzb_name),
            json!(content),
            json!(options.category.clone().unwrap_or_default()),
            json!(0),     // priority
            json!(false), // add to top
            json!(options.paused),
            json!(""),    // dupe key
            json!(0),     // dupe score
            json!("SCORE"),
            json!([]),    // post-processing parameters
        ]
    }

    /// `append` returns the new NZBID (positive) or a failure code.
    fn append_result(result: NzbResult) -> NzbAddUrlResult {
        if !result.success {
            return NzbAddUrlResult::fail(result.error.unwrap_or_default());
        }
        match result.result.as_ref().and_then(Value::as_i64) {
            Some(id) if id > 0 => NzbAddUrlResult::ok(id.to_string()),
            _ => NzbAddUrlResult::fail("NZBGet rejected the NZB"),
        }
    }

    /// Group edit commands take numeric ids.
    async fn edit_group(&self, command: &str, id: &str) -> NzbResult {
        let numeric: i64 = match id.parse() {
            Ok(n) => n,
            Err(_) => return NzbResult::fail("editqueue", format!("invalid NZBGet id: {}", id)),
        };
        self.rpc("editqueue", vec![json!(command), json!(""), json!([numeric])])
            .await
    }
}

fn i64_field(obj: &Value, key: &str) -> i64 {
    obj.get(key).and_then(Value::as_i64).unwrap_or(0)
}

fn f64_field(obj: &Value, key: &str) -> f64 {
    obj.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn str_field(obj: &Value, key: &str) -> String {
    obj.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Derives the queue-level status word from NZBGet's two boolean flags.
fn derive_status(status: &Value) -> String {
    let standby = status.get("ServerStandBy").and_then(Value::as_bool).unwrap_or(false);
    let paused = status
        .get("DownloadPaused")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if standby && paused {
        "Paused".to_string()
    } else if standby {
        "Idle".to_string()
    } else {
        "Downloading".to_string()
    }
}

/// Seconds-remaining as a clock string, `"∞"` when nothing is moving.
fn time_remaining(remaining_bytes: u64, speed_bytes: u64) -> String {
    if speed_bytes == 0 {
        units::INFINITY.to_string()
    } else {
        units::human_seconds(remaining_bytes / speed_bytes)
    }
}

fn parse_group(group: &Value, speed_bytes: u64) -> NzbQueueItem {
    let size_bytes = units::mb_to_bytes(f64_field(group, "FileSizeMB"));
    let size_remaining_bytes = units::mb_to_bytes(f64_field(group, "RemainingSizeMB"));
    NzbQueueItem {
        id: i64_field(group, "NZBID").to_string(),
        status: normalize_status(&str_field(group, "Status")),
        name: str_field(group, "NZBName"),
        category: str_field(group, "Category"),
        size: units::human_size(size_bytes),
        size_bytes,
        size_remaining: units::human_size(size_remaining_bytes),
        size_remaining_bytes,
        time_remaining: time_remaining(size_remaining_bytes, speed_bytes),
        percentage: NzbQueueItem::percentage_of(size_bytes, size_remaining_bytes),
    }
}

#[async_trait]
impl Downloader for NzbgetClient {
    fn downloader_type(&self) -> DownloaderType {
        DownloaderType::Nzbget
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, operation: &str, params: CallParams) -> NzbResult {
        let params = match params {
            CallParams::None => Vec::new(),
            CallParams::Positional(values) => values,
            // JSON-RPC params are positional; named pairs degrade to their
            // values in pair order.
            CallParams::Named(pairs) => pairs.into_iter().map(|(_, v)| json!(v)).collect(),
        };
        self.rpc(operation, params).await
    }

    async fn get_categories(&self) -> Result<Vec<String>> {
        let result = self.rpc("config", Vec::new()).await;
        if !result.success {
            return Err(NzbError::Protocol(result.error.unwrap_or_default()));
        }
        let categories = result
            .result
            .as_ref()
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| {
                        e.get("Name")
                            .and_then(Value::as_str)
                            .is_some_and(|name| CATEGORY_KEY.is_match(name))
                    })
                    .map(|e| str_field(e, "Value"))
                    .filter(|v| !v.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Ok(categories)
    }

    async fn set_max_speed(&self, bytes: u64) -> NzbResult {
        // rate takes KB/s; 0 lifts the limit
        self.rpc("rate", vec![json!(bytes / units::KILOBYTE)]).await
    }

    async fn get_queue(&self) -> Result<NzbQueue> {
        let status = self.rpc("status", Vec::new()).await;
        if !status.success {
            return Err(NzbError::Protocol(status.error.unwrap_or_default()));
        }
        let status = status.result.unwrap_or(Value::Null);

        let groups = self.rpc("listgroups", Vec::new()).await;
        if !groups.success {
            return Err(NzbError::Protocol(groups.error.unwrap_or_default()));
        }
        let groups = groups.result.unwrap_or(Value::Null);

        let speed_bytes = i64_field(&status, "DownloadRate").max(0) as u64;
        let max_speed_bytes = i64_field(&status, "DownloadLimit").max(0) as u64;
        let remaining_bytes = units::mb_to_bytes(f64_field(&status, "RemainingSizeMB"));
        let items = groups
            .as_array()
            .map(|list| list.iter().map(|g| parse_group(g, speed_bytes)).collect())
            .unwrap_or_default();
        let categories = self.get_categories().await.unwrap_or_default();

        Ok(NzbQueue {
            downloader_name: self.name.clone(),
            downloader_type: DownloaderType::Nzbget,
            status: derive_status(&status),
            speed: units::human_size(speed_bytes),
            speed_bytes,
            max_speed: units::human_size(max_speed_bytes),
            max_speed_bytes,
            size_remaining: units::human_size(remaining_bytes),
            time_remaining: time_remaining(remaining_bytes, speed_bytes),
            categories,
            queue: items,
        })
    }

    async fn pause_queue(&self) -> NzbResult {
        self.rpc("pausedownload", Vec::new()).await
    }

    async fn resume_queue(&self) -> NzbResult {
        self.rpc("resumedownload", Vec::new()).await
    }

    async fn add_url(&self, url: &str, options: &AddNzbOptions) -> NzbAddUrlResult {
        let nzb_name = options.name.clone().unwrap_or_default();
        let params = Self::append_params(&nzb_name, url, options);
        Self::append_result(self.rpc("append", params).await)
    }

    async fn add_file(&self, filename: &str, content: Vec<u8>, options: &AddNzbOptions) -> NzbAddUrlResult {
        let nzb_name = options.name.clone().unwrap_or_else(|| filename.to_string());
        let encoded = BASE64.encode(content);
        let params = Self::append_params(&nzb_name, &encoded, options);
        Self::append_result(self.rpc("append", params).await)
    }

    async fn remove_id(&self, id: &str) -> NzbResult {
        self.edit_group("GroupDelete", id).await
    }

    async fn pause_id(&self, id: &str) -> NzbResult {
        self.edit_group("GroupPause", id).await
    }

    async fn resume_id(&self, id: &str) -> NzbResult {
        self.edit_group("GroupResume", id).await
    }

    async fn test(&self) -> NzbResult {
        let result = self.rpc("status", Vec::new()).await;
        NzbResult {
            operation: Some("test".to_string()),
            ..result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_derive_status_combinations() {
        assert_eq!(
            derive_status(&json!({"ServerStandBy": true, "DownloadPaused": true})),
            "Paused"
        );
        assert_eq!(
            derive_status(&json!({"ServerStandBy": true, "DownloadPaused": false})),
            "Idle"
        );
        assert_eq!(
            derive_status(&json!({"ServerStandBy": false, "DownloadPaused": false})),
            "Downloading"
        );
        // paused flag alone does not stop active downloads from showing
        assert_eq!(
            derive_status(&json!({"ServerStandBy": false, "DownloadPaused": true})),
            "Downloading"
        );
    }

    #[test]
    fn test_time_remaining_guards_zero_speed() {
        assert_eq!(time_remaining(1024, 0), "∞");
        assert_eq!(time_remaining(3600 * 1024, 1024), "1:00:00");
    }

    #[test]
    fn test_category_key_regex() {
        assert!(CATEGORY_KEY.is_match("Category1.Name"));
        assert!(CATEGORY_KEY.is_match("Category12.Name"));
        assert!(!CATEGORY_KEY.is_match("Category1.DestDir"));
        assert!(!CATEGORY_KEY.is_match("XCategory1.Name"));
    }

    #[test]
    fn test_append_params_shape() {
        let opts = AddNzbOptions {
            category: Some("movies".to_string()),
            name: Some("foo".to_string()),
            paused: true,
            extra: Vec::new(),
        };
        let params = NzbgetClient::append_params("foo", "http://x/y.nzb", &opts);
        assert_eq!(params.len(), 10);
        assert_eq!(params[0], json!("foo"));
        assert_eq!(params[1], json!("http://x/y.nzb"));
        assert_eq!(params[2], json!("movies"));
        assert_eq!(params[5], json!(true));
    }

    #[test]
    fn test_append_result_ids() {
        let ok = NzbgetClient::append_result(NzbResult::ok("append", json!(42)));
        assert!(ok.success);
        assert_eq!(ok.result.as_deref(), Some("42"));

        let rejected = NzbgetClient::append_result(NzbResult::ok("append", json!(0)));
        assert!(!rejected.success);

        let failed = NzbgetClient::append_result(NzbResult::fail("append", "boom"));
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }
}
