//! Device-local data collaborators.
//!
//! Some contracts also collect data that lives on the device rather than
//! behind the remote session. The query itself is platform specific and
//! lives behind [`DeviceDataService`].

mod mock;

pub use mock::{MockDeviceData, RecordingErrorSink};

use crate::download::FileCallback;
use async_trait::async_trait;
use session_sync_types::{FileItem, SyncError};

/// Queries device-local data over a time window.
#[async_trait]
pub trait DeviceDataService: Send + Sync {
    /// Collect device data between `from` and `to` (epoch seconds).
    ///
    /// Each produced file is delivered through `on_file`; the returned items
    /// are appended to the final listing.
    async fn query(
        &self,
        from: u64,
        to: u64,
        on_file: FileCallback,
    ) -> Result<Vec<FileItem>, SyncError>;
}

/// Receives device-data failures for diagnostics.
pub trait ErrorSink: Send + Sync {
    /// Record an error.
    fn report(&self, error: &SyncError);
}
