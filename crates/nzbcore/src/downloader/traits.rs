//! The operation contract every download-client backend implements.

use async_trait::async_trait;
use serde_json::Value;

use crate::downloader::models::{
    AddNzbOptions, DownloaderType, NzbAddUrlResult, NzbQueue, NzbQueueItem, NzbResult,
};
use crate::error::Result;

/// Backend-specific shape of a raw call's parameters: SABnzbd takes named
/// query parameters, NZBGet takes positional JSON-RPC params.
#[derive(Debug, Clone, Default)]
pub enum CallParams {
    #[default]
    None,
    /// Named parameters (SABnzbd query-style API).
    Named(Vec<(String, String)>),
    /// Positional parameters (NZBGet JSON-RPC).
    Positional(Vec<Value>),
}

impl From<Vec<(String, String)>> for CallParams {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::Named(pairs)
    }
}

impl From<Vec<Value>> for CallParams {
    fn from(values: Vec<Value>) -> Self {
        Self::Positional(values)
    }
}

/// Uniform contract over the two download-client protocols.
///
/// Adapters catch and normalize all network/protocol failures into
/// `NzbResult { success: false, .. }` — expected failure modes never escape
/// as `Err`. `get_queue`/`get_categories` return `Err` only for transport
/// failures the caller may want to degrade on.
#[async_trait]
pub trait Downloader: Send + Sync {
    fn downloader_type(&self) -> DownloaderType;

    /// Profile name this adapter was constructed from.
    fn name(&self) -> &str;

    /// Raw protocol call; the adapter shapes `params` into its native
    /// request format.
    async fn call(&self, operation: &str, params: CallParams) -> NzbResult;

    /// User-selectable category names, in backend order.
    async fn get_categories(&self) -> Result<Vec<String>>;

    /// `0` means "unlimited".
    async fn set_max_speed(&self, bytes: u64) -> NzbResult;

    /// Fresh point-in-time snapshot of the backend queue.
    async fn get_queue(&self) -> Result<NzbQueue>;

    async fn pause_queue(&self) -> NzbResult;

    async fn resume_queue(&self) -> NzbResult;

    async fn add_url(&self, url: &str, options: &AddNzbOptions) -> NzbAddUrlResult;

    async fn add_file(&self, filename: &str, content: Vec<u8>, options: &AddNzbOptions) -> NzbAddUrlResult;

    async fn remove_id(&self, id: &str) -> NzbResult;

    async fn pause_id(&self, id: &str) -> NzbResult;

    async fn resume_id(&self, id: &str) -> NzbResult;

    async fn remove_item(&self, item: &NzbQueueItem) -> NzbResult {
        self.remove_id(&item.id).await
    }

    async fn pause_item(&self, item: &NzbQueueItem) -> NzbResult {
        self.pause_id(&item.id).await
    }

    async fn resume_item(&self, item: &NzbQueueItem) -> NzbResult {
        self.resume_id(&item.id).await
    }

    /// Lightweight connectivity/credential check.
    async fn test(&self) -> NzbResult;
}
