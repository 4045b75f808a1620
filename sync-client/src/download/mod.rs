//! Download engine interface.
//!
//! The engine runs transfers concurrently and reports back in two ways:
//! a per-file callback for each finished download, and one aggregate
//! "all finished" handler whenever the queue drains. The files reader only
//! reacts to those signals; it never manages transfer concurrency itself.

mod mock;

pub use mock::MockDownloadEngine;

use session_sync_types::{DownloadedFile, SyncError};
use std::sync::Arc;

/// Receives each downloaded (or failed) file.
pub type FileCallback = Arc<dyn Fn(Result<DownloadedFile, SyncError>) + Send + Sync>;

/// Invoked when the download queue has drained.
pub type AllFinishedHandler = Arc<dyn Fn() + Send + Sync>;

/// One file to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Listing item name.
    pub file_id: String,
    /// Session the file belongs to.
    pub session_key: String,
    /// Last-updated timestamp of the listing item.
    pub updated_date: u64,
}

/// Concurrent file download engine.
pub trait DownloadEngine: Send + Sync {
    /// Queue a download; `on_done` receives the result.
    fn enqueue(&self, request: DownloadRequest, on_done: FileCallback);

    /// Whether any download is still in flight.
    fn is_downloading(&self) -> bool;

    /// Install (or remove) the handler fired when the queue drains.
    fn set_all_finished_handler(&self, handler: Option<AllFinishedHandler>);

    /// Cancel every in-flight download. Their callbacks are not invoked.
    fn cancel_all(&self);
}
