//! Unified data model shared by all downloader backends.
//!
//! Both adapters normalize their native queue/status representations into
//! these types so callers never branch on backend type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::units;

/// Supported download client backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DownloaderType {
    #[default]
    #[serde(rename = "SABnzbd")]
    Sabnzbd,
    #[serde(rename = "NZBGet")]
    Nzbget,
}

impl std::fmt::Display for DownloaderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sabnzbd => write!(f, "SABnzbd"),
            Self::Nzbget => write!(f, "NZBGet"),
        }
    }
}

/// Uniform outcome wrapper for any mutating/query call.
///
/// Expected failures (bad credentials, unreachable host, backend-reported
/// errors) land here with `success: false` — they are values, not `Err`s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NzbResult {
    pub success: bool,
    pub operation: Option<String>,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl NzbResult {
    pub fn ok(operation: impl Into<String>, result: Value) -> Self {
        Self {
            success: true,
            operation: Some(operation.into()),
            result: Some(result),
            error: None,
        }
    }

    pub fn fail(operation: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            operation: Some(operation.into()),
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Narrower outcome for add operations; `result` is the backend item id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NzbAddUrlResult {
    pub success: bool,
    pub result: Option<String>,
    pub error: Option<String>,
}

impl NzbAddUrlResult {
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            success: true,
            result: Some(id.into()),
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Options accepted by `add_url` / `add_file`.
#[derive(Debug, Clone, Default)]
pub struct AddNzbOptions {
    /// Target category on the backend.
    pub category: Option<String>,
    /// Override for the queued item's display name.
    pub name: Option<String>,
    /// Add the item paused.
    pub paused: bool,
    /// Backend-specific passthrough parameters (SABnzbd forwards these as
    /// query parameters; NZBGet ignores unknown keys).
    pub extra: Vec<(String, String)>,
}

/// One entry in the download queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NzbQueueItem {
    /// Backend-native identifier, opaque; used for mutation calls.
    pub id: String,
    pub status: String,
    pub name: String,
    pub category: String,
    pub size: String,
    pub size_bytes: u64,
    pub size_remaining: String,
    pub size_remaining_bytes: u64,
    pub time_remaining: String,
    /// Completion percentage, 0–100.
    pub percentage: u8,
}

impl NzbQueueItem {
    /// Derives the completion percentage, guarding against a zero size
    /// (treated as 0% rather than dividing by zero).
    pub fn percentage_of(size_bytes: u64, remaining_bytes: u64) -> u8 {
        if size_bytes == 0 {
            return 0;
        }
        let done = size_bytes.saturating_sub(remaining_bytes);
        ((done * 100) / size_bytes).min(100) as u8
    }
}

/// Point-in-time snapshot of backend queue state.
///
/// Constructed fresh on every `get_queue()` call and never mutated in
/// place. `queue` preserves backend-supplied order, which is display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NzbQueue {
    /// Profile name of the downloader this snapshot came from.
    pub downloader_name: String,
    pub downloader_type: DownloaderType,
    /// Normalized to a capitalized word: "Downloading" / "Paused" /
    /// "Idle" / "Error".
    pub status: String,
    pub speed: String,
    pub speed_bytes: u64,
    pub max_speed: String,
    pub max_speed_bytes: u64,
    pub size_remaining: String,
    /// Human string; the `"∞"` sentinel when speed is zero.
    pub time_remaining: String,
    /// Category names available on the backend, in backend order.
    pub categories: Vec<String>,
    pub queue: Vec<NzbQueueItem>,
}

impl NzbQueue {
    /// Degraded snapshot published when a refresh tick fails; keeps the
    /// periodic timer alive while signalling the error state to listeners.
    pub fn error_snapshot(name: &str, downloader_type: DownloaderType) -> Self {
        Self {
            downloader_name: name.to_string(),
            downloader_type,
            status: "Error".to_string(),
            speed: units::human_size(0),
            speed_bytes: 0,
            max_speed: units::human_size(0),
            max_speed_bytes: 0,
            size_remaining: units::human_size(0),
            time_remaining: units::INFINITY.to_string(),
            categories: Vec::new(),
            queue: Vec::new(),
        }
    }
}

/// Normalizes a backend status word to a single capitalized word:
/// `"DOWNLOADING"` / `"downloading"` -> `"Downloading"`.
pub fn normalize_status(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
