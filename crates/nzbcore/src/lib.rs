//! Unified client layer for NZB download backends.
//!
//! SABnzbd and NZBGet speak very different protocols (flat query-style GET
//! vs JSON-RPC POST); this crate hides the difference behind one
//! [`Downloader`](downloader::Downloader) contract, normalizes queue state
//! into a single [`NzbQueue`](downloader::NzbQueue) model, discovers API
//! endpoints from partial host input, and offers a polling
//! [`NzbClient`](client::NzbClient) facade that publishes snapshots over a
//! watch channel.

pub mod client;
pub mod downloader;
pub mod error;
pub mod options;
pub mod request;
pub mod units;

pub use client::NzbClient;
pub use downloader::{
    AddNzbOptions, AnyDownloader, CallParams, Downloader, DownloaderType, NzbAddUrlResult,
    NzbQueue, NzbQueueItem, NzbResult,
};
pub use error::{NzbError, Result};
pub use options::{DownloaderOptions, MemoryProfileStore, ProfileStore};
