//! Mock download engine for testing.
//!
//! Downloads either complete on their own after a fixed delay, or are held
//! until the test releases them.

use super::{AllFinishedHandler, DownloadEngine, DownloadRequest, FileCallback};
use session_sync_types::DownloadedFile;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock download engine.
///
/// In auto mode every enqueued download finishes after `delay` and
/// delivers a small JSON payload. In held mode downloads stay in flight
/// until [`release_all`](Self::release_all).
#[derive(Clone, Default)]
pub struct MockDownloadEngine {
    inner: Arc<Mutex<MockDownloadInner>>,
}

#[derive(Default)]
struct MockDownloadInner {
    delay: Option<Duration>,
    requests: Vec<DownloadRequest>,
    held: Vec<(DownloadRequest, FileCallback)>,
    in_flight: usize,
    handler: Option<AllFinishedHandler>,
    /// Bumped by `cancel_all` so timers from cancelled downloads are dropped.
    generation: u64,
    cancel_count: usize,
}

impl MockDownloadEngine {
    /// Engine whose downloads finish after `delay`.
    pub fn auto(delay: Duration) -> Self {
        let engine = Self::default();
        engine.inner.lock().unwrap().delay = Some(delay);
        engine
    }

    /// Engine whose downloads stay in flight until released.
    pub fn held() -> Self {
        Self::default()
    }

    /// Every request enqueued so far.
    pub fn requests(&self) -> Vec<DownloadRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Number of `cancel_all()` calls.
    pub fn cancel_count(&self) -> usize {
        self.inner.lock().unwrap().cancel_count
    }

    /// Whether an all-finished handler is installed.
    pub fn has_handler(&self) -> bool {
        self.inner.lock().unwrap().handler.is_some()
    }

    /// Finish every held download successfully, then fire the handler.
    pub fn release_all(&self) {
        let (held, handler) = {
            let mut inner = self.inner.lock().unwrap();
            let held: Vec<_> = inner.held.drain(..).collect();
            inner.in_flight = inner.in_flight.saturating_sub(held.len());
            let handler = if inner.in_flight == 0 {
                inner.handler.clone()
            } else {
                None
            };
            (held, handler)
        };

        for (request, on_done) in held {
            on_done(Ok(payload_for(&request)));
        }
        if let Some(handler) = handler {
            handler();
        }
    }

    fn finish_one(&self, request: DownloadRequest, on_done: FileCallback, generation: u64) {
        let handler = {
            let mut inner = self.inner.lock().unwrap();
            if inner.generation != generation {
                return;
            }
            inner.in_flight = inner.in_flight.saturating_sub(1);
            if inner.in_flight == 0 {
                inner.handler.clone()
            } else {
                None
            }
        };

        on_done(Ok(payload_for(&request)));
        if let Some(handler) = handler {
            handler();
        }
    }
}

fn payload_for(request: &DownloadRequest) -> DownloadedFile {
    let body = format!("{{\"id\":\"{}\"}}", request.file_id);
    DownloadedFile::new(
        request.file_id.clone(),
        request.updated_date,
        "application/json",
        body.into_bytes(),
    )
}

impl DownloadEngine for MockDownloadEngine {
    fn enqueue(&self, request: DownloadRequest, on_done: FileCallback) {
        let (delay, generation) = {
            let mut inner = self.inner.lock().unwrap();
            inner.requests.push(request.clone());
            inner.in_flight += 1;
            if inner.delay.is_none() {
                inner.held.push((request, on_done));
                return;
            }
            (inner.delay, inner.generation)
        };

        let engine = self.clone();
        let delay = delay.unwrap_or_default();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.finish_one(request, on_done, generation);
        });
    }

    fn is_downloading(&self) -> bool {
        self.inner.lock().unwrap().in_flight > 0
    }

    fn set_all_finished_handler(&self, handler: Option<AllFinishedHandler>) {
        self.inner.lock().unwrap().handler = handler;
    }

    fn cancel_all(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.generation += 1;
        inner.in_flight = 0;
        inner.held.clear();
        inner.cancel_count += 1;
    }
}
