//! Downloaded file payloads.

/// A file delivered to the per-file callback, already decrypted.
///
/// Produced either by the download engine (remote files) or by the
/// device-data service (local files).
#[derive(Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// Name of the listing item this file came from.
    pub id: String,
    /// Last-updated timestamp of the item, epoch milliseconds.
    pub updated_date: u64,
    /// MIME type reported for the payload.
    pub mime_type: String,
    /// The decrypted payload.
    pub data: Vec<u8>,
}

impl DownloadedFile {
    /// Create a new downloaded file.
    pub fn new(id: impl Into<String>, updated_date: u64, mime_type: &str, data: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            updated_date,
            mime_type: mime_type.to_string(),
            data,
        }
    }
}

impl std::fmt::Debug for DownloadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadedFile")
            .field("id", &self.id)
            .field("updated_date", &self.updated_date)
            .field("mime_type", &self.mime_type)
            .field("data", &format!("[{} bytes REDACTED]", self.data.len()))
            .finish()
    }
}
