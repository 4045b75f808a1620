//! Mock device-data collaborators for testing.

use super::{DeviceDataService, ErrorSink};
use crate::download::FileCallback;
use async_trait::async_trait;
use session_sync_types::{DownloadedFile, FileItem, SyncError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock device-data service answering with a fixed result.
#[derive(Debug, Clone)]
pub struct MockDeviceData {
    inner: Arc<Mutex<MockDeviceInner>>,
}

#[derive(Debug)]
struct MockDeviceInner {
    result: Result<Vec<FileItem>, SyncError>,
    latency: Option<Duration>,
    queries: Vec<(u64, u64)>,
}

impl MockDeviceData {
    /// Answer every query with `items`.
    pub fn new(items: Vec<FileItem>) -> Self {
        Self::with_result(Ok(items))
    }

    /// Fail every query with `error`.
    pub fn failing(error: SyncError) -> Self {
        Self::with_result(Err(error))
    }

    fn with_result(result: Result<Vec<FileItem>, SyncError>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockDeviceInner {
                result,
                latency: None,
                queries: Vec::new(),
            })),
        }
    }

    /// Delay every answer by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.inner.lock().unwrap().latency = Some(latency);
        self
    }

    /// Windows queried so far.
    pub fn queries(&self) -> Vec<(u64, u64)> {
        self.inner.lock().unwrap().queries.clone()
    }
}

#[async_trait]
impl DeviceDataService for MockDeviceData {
    async fn query(
        &self,
        from: u64,
        to: u64,
        on_file: FileCallback,
    ) -> Result<Vec<FileItem>, SyncError> {
        let (result, latency) = {
            let mut inner = self.inner.lock().unwrap();
            inner.queries.push((from, to));
            (inner.result.clone(), inner.latency)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if let Ok(items) = &result {
            for item in items {
                on_file(Ok(DownloadedFile::new(
                    item.name.clone(),
                    item.updated_date,
                    "application/json",
                    Vec::new(),
                )));
            }
        }
        result
    }
}

/// Error sink that keeps every reported error.
#[derive(Debug, Clone, Default)]
pub struct RecordingErrorSink {
    errors: Arc<Mutex<Vec<SyncError>>>,
}

impl RecordingErrorSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors reported so far.
    pub fn errors(&self) -> Vec<SyncError> {
        self.errors.lock().unwrap().clone()
    }
}

impl ErrorSink for RecordingErrorSink {
    fn report(&self, error: &SyncError) {
        self.errors.lock().unwrap().push(error.clone());
    }
}
