//! # sync-types
//!
//! Data model shared by the session-sync crates.
//!
//! This crate provides the foundational types used across the workspace:
//! - [`FileItem`], [`FileListing`], [`SyncStatus`] - what the listing endpoint reports
//! - [`Session`] - the remote session a run polls against
//! - [`TimeRange`], [`TimeRangeLimits`] - contract time constraints
//! - [`DownloadedFile`] - what the per-file callback receives
//! - [`SyncError`] - Error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod file;
mod listing;
mod session;
mod time;

pub use error::SyncError;
pub use file::DownloadedFile;
pub use listing::{FileItem, FileListing, SyncState, SyncStatus};
pub use session::Session;
pub use time::{ReadOptions, TimeRange, TimeRangeLimits};
