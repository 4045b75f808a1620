//! Error types for session-sync.

use thiserror::Error;

/// Errors that can end a sync run or fail one of its steps.
///
/// Collaborator failures (network, parsing, device data) are carried as
/// messages so the error can be stored as a run's soft error and still be
/// delivered to the completion callback later.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// A run is already active on this reader
    #[error("already reading all files")]
    AlreadyRunning,

    /// Session missing or expired
    #[error("invalid session")]
    InvalidSession,

    /// Could not mint an authorization token
    #[error("failed to create request token")]
    TokenCreationFailed,

    /// Listing stayed unchanged for too many consecutive polls
    #[error("file list polling timed out")]
    ListingPollingTimeout,

    /// Remote status stayed pending for too many evaluations
    #[error("sync stayed pending for too long")]
    SyncPendingTimeout,

    /// Run exceeded the maximum sync duration
    #[error("sync exceeded maximum duration")]
    SyncTimeout,

    /// Requested time range does not overlap the contract's range
    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),

    /// Network or transport failure
    #[error("network error: {0}")]
    Network(String),

    /// Response could not be decoded
    #[error("parse error: {0}")]
    Parse(String),

    /// Contract certificate could not be fetched or verified
    #[error("certificate error: {0}")]
    Certificate(String),

    /// Device-local data query failed
    #[error("device data error: {0}")]
    DeviceData(String),

    /// Individual file download failed
    #[error("download error: {0}")]
    Download(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Whether this error is one of the counter-based run timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ListingPollingTimeout | Self::SyncPendingTimeout | Self::SyncTimeout
        )
    }
}
