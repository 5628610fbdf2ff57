//! Persisted downloader configuration and the profile-store boundary.
//!
//! The store itself is an external collaborator (the embedding application
//! decides where profiles live); this module defines the async contract the
//! facade consumes plus an in-memory implementation for tests and simple
//! embedders.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, RwLock};

use crate::downloader::models::DownloaderType;
use crate::error::{NzbError, Result};

/// One named backend connection.
///
/// `api_url` may be partial/ambiguous as entered by the user; it becomes
/// canonical after endpoint discovery. `name` must be unique within a
/// profile set (enforced by [`ProfileStore::set_profiles`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloaderOptions {
    pub name: String,
    #[serde(rename = "type")]
    pub downloader_type: DownloaderType,
    pub api_url: String,
    /// SABnzbd only.
    pub api_key: Option<String>,
    /// NZBGet credentials; also usable as HTTP basic auth for either
    /// backend behind an authenticated proxy.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Optional browser-facing URL, distinct from the API URL.
    pub web_url: Option<String>,
}

impl DownloaderOptions {
    pub fn new(name: impl Into<String>, downloader_type: DownloaderType, api_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            downloader_type,
            api_url: api_url.into(),
            api_key: None,
            username: None,
            password: None,
            web_url: None,
        }
    }
}

/// Picks the profile to activate when none is explicitly selected:
/// exact name `"Default"`, then `"default"`, then first by insertion order.
pub fn default_profile(profiles: &[DownloaderOptions]) -> Option<&DownloaderOptions> {
    profiles
        .iter()
        .find(|p| p.name == "Default")
        .or_else(|| profiles.iter().find(|p| p.name == "default"))
        .or_else(|| profiles.first())
}

/// Async key-value boundary over persisted downloader profiles.
///
/// The facade only consumes the active-downloader accessors; the profile
/// list accessors exist for options UIs.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profiles(&self) -> Result<Vec<DownloaderOptions>>;

    /// Replaces the whole profile set. Fails on duplicate names.
    async fn set_profiles(&self, profiles: Vec<DownloaderOptions>) -> Result<()>;

    /// The currently-active profile, falling back to [`default_profile`]
    /// when no explicit selection exists.
    async fn get_active_downloader(&self) -> Result<Option<DownloaderOptions>>;

    async fn set_active_downloader(&self, name: &str) -> Result<()>;

    /// Change subscription: receives the active profile whenever the
    /// selection or its fields change.
    fn watch_active_downloader(&self) -> watch::Receiver<Option<DownloaderOptions>>;
}

#[derive(Default)]
struct MemoryState {
    profiles: Vec<DownloaderOptions>,
    active: Option<String>,
}

/// In-memory [`ProfileStore`] used by tests and embedders without a real
/// persistence layer.
pub struct MemoryProfileStore {
    state: RwLock<MemoryState>,
    tx: watch::Sender<Option<DownloaderOptions>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            state: RwLock::new(MemoryState::default()),
            tx,
        }
    }

    fn active_of(&self, state: &MemoryState) -> Option<DownloaderOptions> {
        match &state.active {
            Some(name) => state.profiles.iter().find(|p| &p.name == name).cloned(),
            None => default_profile(&state.profiles).cloned(),
        }
    }
}

impl Default for MemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_profiles(&self) -> Result<Vec<DownloaderOptions>> {
        Ok(self.state.read().await.profiles.clone())
    }

    async fn set_profiles(&self, profiles: Vec<DownloaderOptions>) -> Result<()> {
        for (i, profile) in profiles.iter().enumerate() {
            if profiles[..i].iter().any(|p| p.name == profile.name) {
                return Err(NzbError::Config(format!(
                    "duplicate downloader name: {}",
                    profile.name
                )));
            }
        }
        let mut state = self.state.write().await;
        state.profiles = profiles;
        let active = self.active_of(&state);
        drop(state);
        self.tx.send_replace(active);
        Ok(())
    }

    async fn get_active_downloader(&self) -> Result<Option<DownloaderOptions>> {
        let state = self.state.read().await;
        Ok(self.active_of(&state))
    }

    async fn set_active_downloader(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.profiles.iter().any(|p| p.name == name) {
            return Err(NzbError::Config(format!("unknown downloader: {}", name)));
        }
        state.active = Some(name.to_string());
        let active = self.active_of(&state);
        drop(state);
        self.tx.send_replace(active);
        Ok(())
    }

    fn watch_active_downloader(&self) -> watch::Receiver<Option<DownloaderOptions>> {
        self.tx.subscribe()
    }
}
