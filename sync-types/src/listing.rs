//! File listing types reported by the listing endpoint.

use serde::{Deserialize, Serialize};

/// Metadata for one file available in the current session.
///
/// Identity is the name; a file whose `updated_date` changes between
/// listings is treated as a new version of the same file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileItem {
    /// Stable file name, also used as the download id.
    pub name: String,
    /// Last-updated timestamp, epoch milliseconds.
    pub updated_date: u64,
}

impl FileItem {
    /// Create a new file item.
    pub fn new(name: impl Into<String>, updated_date: u64) -> Self {
        Self {
            name: name.into(),
            updated_date,
        }
    }
}

/// Overall state of the remote side's file production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SyncState {
    /// Remote side has not started producing files yet.
    Pending,
    /// Files are still being produced.
    Running,
    /// Finished, but some sources failed.
    Partial,
    /// Finished successfully.
    Completed,
    /// Any other terminal state.
    Unknown,
}

impl SyncState {
    /// Whether the remote side is still working on this session.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    /// Wire name of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Partial => "partial",
            Self::Completed => "completed",
            Self::Unknown => "unknown",
        }
    }
}

impl From<String> for SyncState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "partial" => Self::Partial,
            "completed" => Self::Completed,
            _ => Self::Unknown,
        }
    }
}

impl From<SyncState> for String {
    fn from(state: SyncState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status block of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Current remote state.
    pub state: SyncState,
}

impl SyncStatus {
    /// Create a status with the given state.
    pub fn new(state: SyncState) -> Self {
        Self { state }
    }
}

/// A snapshot of the files available for the session plus the remote status.
///
/// Two listings are equal iff their items (in order) and status are equal;
/// that equality is what stale-poll detection compares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListing {
    /// Available files, in discovery order.
    #[serde(rename = "fileList", default)]
    pub files: Vec<FileItem>,
    /// Overall status.
    pub status: SyncStatus,
}

impl FileListing {
    /// Create a listing.
    pub fn new(files: Vec<FileItem>, state: SyncState) -> Self {
        Self {
            files,
            status: SyncStatus::new(state),
        }
    }

    /// An empty listing in the given state.
    pub fn empty(state: SyncState) -> Self {
        Self::new(Vec::new(), state)
    }

    /// Current remote state.
    pub fn state(&self) -> SyncState {
        self.status.state
    }

    /// Append device-local items after the remote ones, keeping the status.
    pub fn merged_with(mut self, local: &[FileItem]) -> Self {
        self.files.extend_from_slice(local);
        self
    }
}
