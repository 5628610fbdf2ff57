//! SABnzbd adapter.
//!
//! SABnzbd exposes a flat query-style API: every operation is an HTTP GET
//! with `mode=<operation>&output=json&apikey=<key>`, except `addfile`
//! which is a multipart POST. Successful responses usually wrap the
//! payload in a single-key object named after the operation
//! (`{"queue": {...}}`), which gets collapsed here before callers see it.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::downloader::models::{
    normalize_status, AddNzbOptions, DownloaderType, NzbAddUrlResult, NzbQueue, NzbQueueItem,
    NzbResult,
};
use crate::downloader::traits::{CallParams, Downloader};
use crate::error::{NzbError, Result};
use crate::options::DownloaderOptions;
use crate::request::{http_client, send_request, RequestBody, RequestOptions};
use crate::units;

/// Delay before the deferred pause that emulates add-paused for URL adds
/// (SABnzbd's `addurl` has no atomic add-paused flag in this integration).
const DEFERRED_PAUSE_DELAY: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct SabnzbdClient {
    name: String,
    api_url: String,
    api_key: Option<String>,
    username: Option<String>,
    password: Option<String>,
    client: reqwest::Client,
}

impl SabnzbdClient {
    /// Fails fast on an empty API URL — an adapter cannot exist without a
    /// target.
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
            api_key: options.api_key.clone(),
            username: options.username.clone(),
            password: options.password.clone(),
            client: http_client(),
        })
    }

    fn base_params(&self, operation: &str) -> Vec<(String, String)> {
        let mut params = vec![("output".to_string(), "json".to_string())];
        if let Some(key) = &self.api_key {
            params.push(("apikey".to_string(), key.clone()));
        }
        params.push(("mode".to_string(), operation.to_string()));
        params
    }

    /// Maps the uniform add-options onto SABnzbd's own field names
    /// (`name` → `nzbname`, `category` → `cat`), passing extras through.
    fn add_params(options: &AddNzbOptions) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(name) = &options.name {
            params.push(("nzbname".to_string(), name.clone()));
        }
        if let Some(category) = &options.category {
            params.push(("cat".to_string(), category.clone()));
        }
        params.extend(options.extra.iter().cloned());
        params
    }

    /// Interprets a decoded SABnzbd response: the `status: false` sentinel
    /// becomes a failure, and single-key wrappers collapse to their value.
    fn interpret(operation: &str, value: Value) -> NzbResult {
        if let Value::Object(map) = &value {
            if map.get("status").and_then(Value::as_bool) == Some(false) {
                let error = map
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown SABnzbd error")
                    .to_string();
                return NzbResult::fail(operation, error);
            }
            if map.len() == 1 {
                if let Some(inner) = map.values().next() {
                    return NzbResult::ok(operation, inner.clone());
                }
            }
        }
        NzbResult::ok(operation, value)
    }

    fn add_result(result: NzbResult) -> NzbAddUrlResult {
        if !result.success {
            return NzbAddUrlResult::fail(result.error.unwrap_or_default());
        }
        let id = result
            .result
            .as_ref()
            .and_then(|v| v.get("nzo_ids"))
            .and_then(|v| v.get(0))
            .and_then(Value::as_str)
            .map(str::to_string);
        NzbAddUrlResult {
            success: true,
            result: id,
            error: None,
        }
    }

    /// Emulates add-paused: the item is added unpaused, then paused by id
    /// shortly after, off the caller's critical path.
    fn pause_later(&self, id: &str) {
        let this = self.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(DEFERRED_PAUSE_DELAY).await;
            let result = this.pause_id(&id).await;
            if !result.success {
                log::warn!(
                    "Deferred pause of {} failed: {}",
                    id,
                    result.error.unwrap_or_default()
                );
            }
        });
    }
}

fn text_field(obj: &Value, key: &str) -> String {
    obj.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// SABnzbd reports numbers as strings more often than not.
fn number_field(obj: &Value, key: &str) -> f64 {
    match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn parse_slot(slot: &Value) -> NzbQueueItem {
    let size_bytes = units::mb_to_bytes(number_field(slot, "mb"));
    let size_remaining_bytes = units::mb_to_bytes(number_field(slot, "mbleft"));
    NzbQueueItem {
        id: text_field(slot, "nzo_id"),
        status: normalize_status(&text_field(slot, "status")),
        name: text_field(slot, "filename"),
        category: text_field(slot, "cat"),
        size: units::human_size(size_bytes),
        size_bytes,
        size_remaining: units::human_size(size_remaining_bytes),
        size_remaining_bytes,
        time_remaining: text_field(slot, "timeleft"),
        percentage: NzbQueueItem::percentage_of(size_bytes, size_remaining_bytes),
    }
}

#[async_trait]
impl Downloader for SabnzbdClient {
    fn downloader_type(&self) -> DownloaderType {
        DownloaderType::Sabnzbd
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, operation: &str, params: CallParams) -> NzbResult {
        let mut query = self.base_params(operation);
        match params {
            CallParams::None => {}
            CallParams::Named(pairs) => query.extend(pairs),
            CallParams::Positional(values) => {
                // SABnzbd's API is named-only; positional params indicate a
                // caller bug, not a protocol variant.
                log::warn!(
                    "Ignoring {} positional params for SABnzbd {}",
                    values.len(),
                    operation
                );
            }
        }
        let opts = RequestOptions::get(&self.api_url)
            .params(query)
            .basic_auth(self.username.clone(), self.password.clone());
        match send_request(&self.client, opts).await {
            Ok(value) => Self::interpret(operation, value),
            Err(e) => NzbResult::fail(operation, e.to_string()),
        }
    }

    async fn get_categories(&self) -> Result<Vec<String>> {
        let result = self.call("get_cats", CallParams::None).await;
        if !result.success {
            return Err(NzbError::Protocol(result.error.unwrap_or_default()));
        }
        let categories = result
            .result
            .as_ref()
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    // "*" is SABnzbd's synthetic "no category" entry, not a
                    // real user-selectable category.
                    .filter(|c| *c != "*")
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(categories)
    }

    async fn set_max_speed(&self, bytes: u64) -> NzbResult {
        let value = if bytes == 0 {
            "0".to_string()
        } else {
            format!("{}K", bytes / units::KILOBYTE)
        };
        let params = vec![
            ("name".to_string(), "speedlimit".to_string()),
            ("value".to_string(), value),
        ];
        self.call("config", CallParams::Named(params)).await
    }

    async fn get_queue(&self) -> Result<NzbQueue> {
        let result = self.call("queue", CallParams::None).await;
        if !result.success {
            return Err(NzbError::Protocol(result.error.unwrap_or_default()));
        }
        let queue = result.result.unwrap_or(Value::Null);

        let speed_bytes = units::parse_speed(&text_field(&queue, "speed"));
        let max_speed_bytes = number_field(&queue, "speedlimit_abs").floor() as u64;
        let time_remaining = if speed_bytes == 0 {
            units::INFINITY.to_string()
        } else {
            text_field(&queue, "timeleft")
        };
        let items = queue
            .get("slots")
            .and_then(Value::as_array)
            .map(|slots| slots.iter().map(parse_slot).collect())
            .unwrap_or_default();
        let categories = self.get_categories().await.unwrap_or_default();

        Ok(NzbQueue {
            downloader_name: self.name.clone(),
            downloader_type: DownloaderType::Sabnzbd,
            status: normalize_status(&text_field(&queue, "status")),
            speed: text_field(&queue, "speed"),
            speed_bytes,
            max_speed: units::human_size(max_speed_bytes),
            max_speed_bytes,
            size_remaining: text_field(&queue, "sizeleft"),
            time_remaining,
            categories,
            queue: items,
        })
    }

    async fn pause_queue(&self) -> NzbResult {
        self.call("pause", CallParams::None).await
    }

    async fn resume_queue(&self) -> NzbResult {
        self.call("resume", CallParams::None).await
    }

    async fn add_url(&self, url: &str, options: &AddNzbOptions) -> NzbAddUrlResult {
        let mut params = vec![("name".to_string(), url.to_string())];
        params.extend(Self::add_params(options));
        let result = self.call("addurl", CallParams::Named(params)).await;
        let added = Self::add_result(result);
        if options.paused {
            if let Some(id) = &added.result {
                self.pause_later(id);
            }
        }
        added
    }

    async fn add_file(&self, filename: &str, content: Vec<u8>, options: &AddNzbOptions) -> NzbAddUrlResult {
        // Multipart upload bypasses the query-style call() path entirely;
        // mode and credentials travel as form fields alongside the file.
        let mut fields = self.base_params("addfile");
        fields.extend(Self::add_params(options));
        let opts = RequestOptions::post(&self.api_url)
            .body(RequestBody::Multipart {
                fields,
                file_field: "name".to_string(),
                filename: filename.to_string(),
                content,
            })
            .basic_auth(self.username.clone(), self.password.clone());
        let result = match send_request(&self.client, opts).await {
            Ok(value) => Self::interpret("addfile", value),
            Err(e) => NzbResult::fail("addfile", e.to_string()),
        };
        let added = Self::add_result(result);
        if options.paused {
            if let Some(id) = &added.result {
                self.pause_later(id);
            }
        }
        added
    }

    async fn remove_id(&self, id: &str) -> NzbResult {
        let params = vec![
            ("name".to_string(), "delete".to_string()),
            ("value".to_string(), id.to_string()),
        ];
        self.call("queue", CallParams::Named(params)).await
    }

    async fn pause_id(&self, id: &str) -> NzbResult {
        let params = vec![
            ("name".to_string(), "pause".to_string()),
            ("value".to_string(), id.to_string()),
        ];
        self.call("queue", CallParams::Named(params)).await
    }

    async fn resume_id(&self, id: &str) -> NzbResult {
        let params = vec![
            ("name".to_string(), "resume".to_string()),
            ("value".to_string(), id.to_string()),
        ];
        self.call("queue", CallParams::Named(params)).await
    }

    async fn test(&self) -> NzbResult {
        let params = vec![("skip_dashboard".to_string(), "1".to_string())];
        let result = self.call("fullstatus", CallParams::Named(params)).await;
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
    use serde_json::json;

    fn options() -> DownloaderOptions {
        let mut opts = DownloaderOptions::new("Default", DownloaderType::Sabnzbd, "http://localhost:8080/api");
        opts.api_key = Some("secret".to_string());
        opts
    }

    #[test]
    fn test_missing_api_url_fails_fast() {
        let mut opts = options();
        opts.api_url = "  ".to_string();
        assert!(matches!(SabnzbdClient::new(&opts), Err(NzbError::Config(_))));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let mut opts = options();
        opts.api_url = "http://localhost:8080/api/".to_string();
        let client = SabnzbdClient::new(&opts).unwrap();
        assert_eq!(client.api_url, "http://localhost:8080/api");
    }

    #[test]
    fn test_interpret_collapses_single_key() {
        let result = SabnzbdClient::interpret("queue", json!({"queue": {"status": "Idle"}}));
        assert!(result.success);
        assert_eq!(result.result, Some(json!({"status": "Idle"})));
    }

    #[test]
    fn test_interpret_keeps_multi_key() {
        let value = json!({"status": true, "nzo_ids": ["SABnzbd_1"]});
        let result = SabnzbdClient::interpret("addurl", value.clone());
        assert!(result.success);
        assert_eq!(result.result, Some(value));
    }

    #[test]
    fn test_interpret_status_false_sentinel() {
        let result = SabnzbdClient::interpret("queue", json!({"status": false, "error": "API Key Incorrect"}));
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("API Key Incorrect"));
    }

    #[test]
    fn test_add_params_renames_fields() {
        let opts = AddNzbOptions {
            category: Some("movies".to_string()),
            name: Some("foo".to_string()),
            paused: false,
            extra: vec![("priority".to_string(), "1".to_string())],
        };
        let params = SabnzbdClient::add_params(&opts);
        assert!(params.contains(&("nzbname".to_string(), "foo".to_string())));
        assert!(params.contains(&("cat".to_string(), "movies".to_string())));
        assert!(params.contains(&("priority".to_string(), "1".to_string())));
    }

    #[test]
    fn test_parse_slot_percentage() {
        let slot = json!({
            "nzo_id": "SABnzbd_1",
            "status": "Downloading",
            "filename": "foo.nzb",
            "cat": "movies",
            "mb": "1000",
            "mbleft": "250",
            "timeleft": "0:05:00"
        });
        let item = parse_slot(&slot);
        assert_eq!(item.percentage, 75);
        assert_eq!(item.id, "SABnzbd_1");
        assert_eq!(item.size_bytes, 1000 * units::MEGABYTE);
        assert_eq!(item.time_remaining, "0:05:00");
    }
}
