//! High-level polling facade over the active downloader.
//!
//! Owns the currently-active adapter, publishes queue snapshots on a watch
//! channel, and keeps itself in sync with profile changes coming from the
//! [`ProfileStore`]. Queue consumers subscribe once and receive
//! `Option<NzbQueue>` updates: `Some` snapshots while an adapter is active
//! (including degraded `"Error"` snapshots when a refresh tick fails), and
//! `None` when no downloader is configured.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use crate::downloader::models::{AddNzbOptions, NzbAddUrlResult, NzbQueue, NzbQueueItem, NzbResult};
use crate::downloader::traits::Downloader;
use crate::downloader::AnyDownloader;
use crate::options::ProfileStore;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

pub struct NzbClient {
    store: Arc<dyn ProfileStore>,
    active: RwLock<Option<Arc<AnyDownloader>>>,
    queue_tx: watch::Sender<Option<NzbQueue>>,
    // std Mutex: handles are only touched synchronously, never across await
    refresh_handle: Mutex<Option<JoinHandle<()>>>,
    watch_handle: Mutex<Option<JoinHandle<()>>>,
}

impl NzbClient {
    /// Builds the facade, activates the store's current profile and starts
    /// following profile changes. Does not start periodic refresh; call
    /// [`start_refresh`](Self::start_refresh) for that.
    pub async fn new(store: Arc<dyn ProfileStore>) -> Arc<Self> {
        let (queue_tx, _) = watch::channel(None);
        let client = Arc::new(Self {
            store,
            active: RwLock::new(None),
            queue_tx,
            refresh_handle: Mutex::new(None),
            watch_handle: Mutex::new(None),
        });
        client.reload().await;
        client.spawn_profile_watch();
        client
    }

    /// Re-reads the active profile and swaps the adapter wholesale. A
    /// misconfigured or absent profile clears the adapter rather than
    /// keeping a stale one.
    pub async fn reload(&self) {
        let adapter = match self.store.get_active_downloader().await {
            Ok(Some(options)) => match AnyDownloader::from_options(&options) {
                Ok(adapter) => Some(Arc::new(adapter)),
                Err(e) => {
                    log::warn!("Cannot activate downloader '{}': {}", options.name, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                log::warn!("Cannot read active downloader profile: {}", e);
                None
            }
        };
        *self.active.write().await = adapter;
        self.refresh_queue().await;
    }

    /// The adapter currently in use, if any.
    pub async fn active_downloader(&self) -> Option<Arc<AnyDownloader>> {
        self.active.read().await.clone()
    }

    /// Queue snapshot subscription. The receiver immediately holds the
    /// latest published value.
    pub fn subscribe(&self) -> watch::Receiver<Option<NzbQueue>> {
        self.queue_tx.subscribe()
    }

    /// Follows the profile store's change stream for the facade's
    /// lifetime. Holds only a weak reference so the facade can drop while
    /// the store outlives it.
    fn spawn_profile_watch(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let mut rx = self.store.watch_active_downloader();
        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                match weak.upgrade() {
                    Some(client) => client.reload().await,
                    None => break,
                }
            }
        });
        if let Ok(mut slot) = self.watch_handle.lock() {
            *slot = Some(handle);
        }
    }

    /// Starts (or restarts) periodic queue refresh at the given interval.
    pub fn start_refresh(self: &Arc<Self>, interval: Duration) {
        self.stop_refresh();
        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // first tick fires immediately; skip it, new() already refreshed
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(client) => client.refresh_queue().await,
                    None => break,
                }
            }
        });
        if let Ok(mut slot) = self.refresh_handle.lock() {
            *slot = Some(handle);
        }
    }

    pub fn stop_refresh(&self) {
        if let Ok(mut slot) = self.refresh_handle.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }

    /// One refresh tick: fetch a fresh snapshot and publish it. A failed
    /// fetch publishes a degraded `"Error"` snapshot instead of killing
    /// the refresh cycle.
    pub async fn refresh_queue(&self) {
        let snapshot = match self.active_downloader().await {
            Some(adapter) => match adapter.get_queue().await {
                Ok(queue) => Some(queue),
                Err(e) => {
                    log::warn!("Queue refresh failed for '{}': {}", adapter.name(), e);
                    Some(NzbQueue::error_snapshot(adapter.name(), adapter.downloader_type()))
                }
            },
            None => None,
        };
        // send_replace stores the value even with zero receivers, so a
        // later subscriber still sees the latest snapshot
        self.queue_tx.send_replace(snapshot);
    }

    /// Queue-level controls are no-op successes without an adapter: a
    /// toggle against nothing has trivially succeeded.
    async fn control<F, Fut>(&self, operation: &str, f: F) -> NzbResult
    where
        F: FnOnce(Arc<AnyDownloader>) -> Fut,
        Fut: std::future::Future<Output = NzbResult>,
    {
        match self.active_downloader().await {
            Some(adapter) => {
                let result = f(adapter).await;
                self.refresh_queue().await;
                result
            }
            None => NzbResult::ok(operation, Value::Null),
        }
    }

    pub async fn pause_queue(&self) -> NzbResult {
        self.control("pause_queue", |adapter| async move { adapter.pause_queue().await })
            .await
    }

    pub async fn resume_queue(&self) -> NzbResult {
        self.control("resume_queue", |adapter| async move { adapter.resume_queue().await })
            .await
    }

    pub async fn set_max_speed(&self, bytes: u64) -> NzbResult {
        self.control("set_max_speed", |adapter| async move {
            adapter.set_max_speed(bytes).await
        })
        .await
    }

    /// Adds are not no-ops: without an adapter the NZB has nowhere to go.
    pub async fn add_url(&self, url: &str, options: &AddNzbOptions) -> NzbAddUrlResult {
        match self.active_downloader().await {
            Some(adapter) => {
                let result = adapter.add_url(url, options).await;
                self.refresh_queue().await;
                result
            }
            None => NzbAddUrlResult::fail("no active downloader"),
        }
    }

    pub async fn add_file(&self, filename: &str, content: Vec<u8>, options: &AddNzbOptions) -> NzbAddUrlResult {
        match self.active_downloader().await {
            Some(adapter) => {
                let result = adapter.add_file(filename, content, options).await;
                self.refresh_queue().await;
                result
            }
            None => NzbAddUrlResult::fail("no active downloader"),
        }
    }

    pub async fn remove_id(&self, id: &str) -> NzbResult {
        let id = id.to_string();
        self.control("remove_id", |adapter| async move { adapter.remove_id(&id).await })
            .await
    }

    pub async fn pause_id(&self, id: &str) -> NzbResult {
        let id = id.to_string();
        self.control("pause_id", |adapter| async move { adapter.pause_id(&id).await })
            .await
    }

    pub async fn resume_id(&self, id: &str) -> NzbResult {
        let id = id.to_string();
        self.control("resume_id", |adapter| async move { adapter.resume_id(&id).await })
            .await
    }

    pub async fn remove_item(&self, item: &NzbQueueItem) -> NzbResult {
        self.remove_id(&item.id).await
    }

    pub async fn pause_item(&self, item: &NzbQueueItem) -> NzbResult {
        self.pause_id(&item.id).await
    }

    pub async fn resume_item(&self, item: &NzbQueueItem) -> NzbResult {
        self.resume_id(&item.id).await
    }
}

impl Drop for NzbClient {
    fn drop(&mut self) {
        for slot in [&self.refresh_handle, &self.watch_handle] {
            if let Ok(mut guard) = slot.lock() {
                if let Some(handle) = guard.take() {
                    handle.abort();
                }
            }
        }
    }
}
