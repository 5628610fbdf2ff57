//! Backend selection: one enum covering every concrete adapter, plus the
//! type-level helpers that tie endpoint discovery to a real connectivity
//! probe.

use async_trait::async_trait;

use crate::downloader::discovery;
use crate::downloader::models::{
    AddNzbOptions, DownloaderType, NzbAddUrlResult, NzbQueue, NzbResult,
};
use crate::downloader::nzbget::NzbgetClient;
use crate::downloader::sabnzbd::SabnzbdClient;
use crate::downloader::traits::{CallParams, Downloader};
use crate::error::Result;
use crate::options::DownloaderOptions;

/// Closed set of adapters, dispatched by match instead of vtable. New
/// backends get a variant here and nothing else changes for callers.
#[derive(Clone)]
pub enum AnyDownloader {
    Sabnzbd(SabnzbdClient),
    Nzbget(NzbgetClient),
}

impl AnyDownloader {
    /// Builds the adapter matching the profile's declared type. Fails fast
    /// on invalid configuration (an empty API URL).
    pub fn from_options(options: &DownloaderOptions) -> Result<Self> {
        match options.downloader_type {
            DownloaderType::Sabnzbd => Ok(Self::Sabnzbd(SabnzbdClient::new(options)?)),
            DownloaderType::Nzbget => Ok(Self::Nzbget(NzbgetClient::new(options)?)),
        }
    }

    fn inner(&self) -> &dyn Downloader {
        match self {
            Self::Sabnzbd(c) => c,
            Self::Nzbget(c) => c,
        }
    }
}

#[async_trait]
impl Downloader for AnyDownloader {
    fn downloader_type(&self) -> DownloaderType {
        self.inner().downloader_type()
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    async fn call(&self, operation: &str, params: CallParams) -> NzbResult {
        self.inner().call(operation, params).await
    }

    async fn get_categories(&self) -> Result<Vec<String>> {
        self.inner().get_categories().await
    }

    async fn set_max_speed(&self, bytes: u64) -> NzbResult {
        self.inner().set_max_speed(bytes).await
    }

    async fn get_queue(&self) -> Result<NzbQueue> {
        self.inner().get_queue().await
    }

    async fn pause_queue(&self) -> NzbResult {
        self.inner().pause_queue().await
    }

    async fn resume_queue(&self) -> NzbResult {
        self.inner().resume_queue().await
    }

    async fn add_url(&self, url: &str, options: &AddNzbOptions) -> NzbAddUrlResult {
        self.inner().add_url(url, options).await
    }

    async fn add_file(&self, filename: &str, content: Vec<u8>, options: &AddNzbOptions) -> NzbAddUrlResult {
        self.inner().add_file(filename, content, options).await
    }

    async fn remove_id(&self, id: &str) -> NzbResult {
        self.inner().remove_id(id).await
    }

    async fn pause_id(&self, id: &str) -> NzbResult {
        self.inner().pause_id(id).await
    }

    async fn resume_id(&self, id: &str) -> NzbResult {
        self.inner().resume_id(id).await
    }

    async fn test(&self) -> NzbResult {
        self.inner().test().await
    }
}

impl DownloaderType {
    /// Probes one candidate URL by running the backend's connectivity test
    /// against it with this profile's credentials.
    pub async fn test_api_url(&self, api_url: &str, options: &DownloaderOptions) -> NzbResult {
        let mut probe_options = options.clone();
        probe_options.downloader_type = *self;
        probe_options.api_url = api_url.to_string();
        match AnyDownloader::from_options(&probe_options) {
            Ok(adapter) => adapter.test().await,
            Err(e) => NzbResult::fail("test", e.to_string()),
        }
    }

    /// Expands a partial host into candidates and returns the first one
    /// that answers the connectivity test. `None` means no candidate
    /// validated.
    pub async fn find_api_url(&self, input: &str, options: &DownloaderOptions) -> Option<String> {
        let candidates = discovery::generate_api_url_suggestions(input, &self.host_profile());
        discovery::find_api_url(candidates, |url| async move {
            self.test_api_url(&url, options).await.success
        })
        .await
    }

    /// Concurrent variant returning every candidate that validated, in
    /// candidate order.
    pub async fn find_all_api_urls(&self, input: &str, options: &DownloaderOptions) -> Vec<String> {
        let candidates = discovery::generate_api_url_suggestions(input, &self.host_profile());
        discovery::find_all_api_urls(candidates, |url| async move {
            self.test_api_url(&url, options).await.success
        })
        .await
    }
}
