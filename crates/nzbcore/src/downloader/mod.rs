//! Downloader backends: the uniform contract, the unified data model, the
//! two protocol adapters, and endpoint discovery.

pub mod discovery;
pub mod dispatch;
pub mod models;
pub mod nzbget;
pub mod sabnzbd;
pub mod traits;

pub use dispatch::AnyDownloader;
pub use models::{
    normalize_status, AddNzbOptions, DownloaderType, NzbAddUrlResult, NzbQueue, NzbQueueItem,
    NzbResult,
};
pub use nzbget::NzbgetClient;
pub use sabnzbd::SabnzbdClient;
pub use traits::{CallParams, Downloader};
