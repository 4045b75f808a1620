//! # sync-client
//!
//! Client library for session-based file listing sync.
//!
//! Given a session opened elsewhere, the [`AllFilesReader`] polls the
//! listing endpoint, queues every new or changed file for download, can
//! fuse in device-local data, and decides when the sync is done, stuck or
//! failed.
//!
//! ## Features
//!
//! - **Single active run**: a second start while running is rejected
//! - **Termination ceilings**: stale polls, pending status and total duration
//! - **Device-local data**: windowed by the contract certificate's time range
//! - **Pluggable collaborators**: listing, downloads, sessions, device data (mocks included)
//! - **Pure State Machine**: Uses sync-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use session_sync_client::{AllFilesReader, Collaborators, ReaderConfig};
//!
//! let collaborators = Collaborators::new(listing, downloads, sessions);
//! let reader = AllFilesReader::new(collaborators, ReaderConfig::new("app", "contract"));
//!
//! let listing = reader.sync(Arc::new(|file| store(file))).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod device;
pub mod download;
pub mod reader;
pub mod remote;
pub mod store;
pub mod time_range;

pub use config::{ConfigError, ContractConfig, PollingConfig, ReaderConfig};
pub use device::{DeviceDataService, ErrorSink, MockDeviceData, RecordingErrorSink};
pub use download::{AllFinishedHandler, DownloadEngine, DownloadRequest, FileCallback, MockDownloadEngine};
pub use reader::{AllFilesReader, Collaborators, CompletionCallback, LocalData};
pub use remote::{
    CertificateService, ListingClient, MockCertificateService, MockListingClient, StaticTokenMinter,
    TokenMinter,
};
pub use store::{ContractRangeCache, MemoryRangeCache, MemorySessionStore, SessionStore};
pub use time_range::ContractTimeRangeResolver;

pub use session_sync_core::{Certificate, RunLimits};
pub use session_sync_types::{
    DownloadedFile, FileItem, FileListing, ReadOptions, Session, SyncError, SyncState, TimeRange,
    TimeRangeLimits,
};
