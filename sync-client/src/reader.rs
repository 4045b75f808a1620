//! AllFilesReader - the polling orchestrator.
//!
//! This module provides [`AllFilesReader`], which drives one sync run at a
//! time: it polls the listing endpoint, hands newly discovered files to the
//! download engine, optionally collects device-local data, and delivers a
//! single completion once the run is done, stuck or failed.
//!
//! # Architecture
//!
//! Each run is owned by one spawned task. Every trigger (poll timer, listing
//! response, download batch finished, local data collected) is funnelled
//! into that task and fed to the pure [`RunState`] machine from sync-core;
//! the task then performs the returned actions.
//!
//! ```text
//! read_all_files → run task ──select!──┬── poll timer
//!                      │               ├── listing / device-data results
//!                      ↓               └── download engine "all finished"
//!               sync-core RunState
//! ```
//!
//! # Example
//!
//! ```ignore
//! let reader = AllFilesReader::new(collaborators, ReaderConfig::new("app", "contract"));
//! let listing = reader.sync(Arc::new(|file| println!("{:?}", file))).await?;
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use session_sync_core::{Action, EvalContext, Event, RunState};
use session_sync_types::{FileItem, FileListing, Session, SyncError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinSet};
use tokio::time::Instant;

use crate::config::ReaderConfig;
use crate::device::{DeviceDataService, ErrorSink};
use crate::download::{DownloadEngine, DownloadRequest, FileCallback};
use crate::remote::ListingClient;
use crate::store::SessionStore;
use crate::time_range::ContractTimeRangeResolver;

/// Receives the run's final result, exactly once.
pub type CompletionCallback = Box<dyn FnOnce(Result<FileListing, SyncError>) + Send>;

/// Collaborators needed to collect device-local data.
#[derive(Clone)]
pub struct LocalData {
    /// Resolves the contract's allowed window.
    pub resolver: Arc<ContractTimeRangeResolver>,
    /// Queries the device.
    pub service: Arc<dyn DeviceDataService>,
    /// Receives device-data failures.
    pub error_sink: Option<Arc<dyn ErrorSink>>,
}

/// External services the reader consumes.
#[derive(Clone)]
pub struct Collaborators {
    /// Listing endpoint.
    pub listing: Arc<dyn ListingClient>,
    /// Download engine.
    pub downloads: Arc<dyn DownloadEngine>,
    /// Session store.
    pub sessions: Arc<dyn SessionStore>,
    /// Device-local data, absent when the platform has none.
    pub local: Option<LocalData>,
}

impl Collaborators {
    /// Collaborators without device-local data.
    pub fn new(
        listing: Arc<dyn ListingClient>,
        downloads: Arc<dyn DownloadEngine>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            listing,
            downloads,
            sessions,
            local: None,
        }
    }

    /// Add device-local data collaborators.
    pub fn with_local_data(mut self, local: LocalData) -> Self {
        self.local = Some(local);
        self
    }
}

/// State shared between the reader handle and its run task.
#[derive(Default)]
struct Shared {
    /// Re-entrancy guard; set while a run is active.
    running: AtomicBool,
    active: Mutex<Option<ActiveRun>>,
    next_run: AtomicU64,
}

impl Shared {
    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct ActiveRun {
    id: u64,
    task: AbortHandle,
}

/// Reads every file of the current session for one contract.
///
/// At most one run is active at a time; a second `read_all_files` while one
/// is running is rejected, never queued.
pub struct AllFilesReader {
    collaborators: Collaborators,
    config: Arc<ReaderConfig>,
    shared: Arc<Shared>,
}

impl AllFilesReader {
    /// Create a reader.
    pub fn new(collaborators: Collaborators, config: ReaderConfig) -> Self {
        Self {
            collaborators,
            config: Arc::new(config),
            shared: Arc::new(Shared::default()),
        }
    }

    /// Start a run.
    ///
    /// `on_file` receives every downloaded remote file and every collected
    /// device file. `on_complete` receives the final listing (remote items
    /// followed by device items) or the error that ended the run.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::AlreadyRunning`] synchronously if a run is
    /// active; that run is left untouched and `on_complete` is dropped.
    pub fn read_all_files(
        &self,
        on_file: FileCallback,
        on_complete: CompletionCallback,
    ) -> Result<(), SyncError> {
        let mut active = self.shared.lock_active();

        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Already reading all files, rejecting new run");
            return Err(SyncError::AlreadyRunning);
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                return Err(SyncError::Internal(format!("no async runtime: {}", e)));
            }
        };

        let local_requested = self.config.contract.device_data && self.collaborators.local.is_some();
        if self.config.contract.device_data && !local_requested {
            tracing::warn!("Device data requested but no device data service configured");
        }

        let id = self.shared.next_run.fetch_add(1, Ordering::Relaxed);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let finished_tx = events_tx.clone();
        self.collaborators
            .downloads
            .set_all_finished_handler(Some(Arc::new(move || {
                tracing::info!("Finished downloading all files");
                let _ = finished_tx.send(Event::DownloadsFinished);
            })));

        let limits = self.config.polling.limits();
        let run = RunTask {
            id,
            state: RunState::new(limits, local_requested),
            collaborators: self.collaborators.clone(),
            config: Arc::clone(&self.config),
            shared: Arc::clone(&self.shared),
            on_file,
            on_complete: Some(on_complete),
            started: Instant::now(),
            next_tick: None,
            session: None,
            completed: false,
            work: JoinSet::new(),
            events: events_rx,
            _events_tx: events_tx,
        };

        let task = runtime.spawn(run.drive());
        *active = Some(ActiveRun {
            id,
            task: task.abort_handle(),
        });
        Ok(())
    }

    /// Run to completion and return the final listing.
    ///
    /// # Errors
    ///
    /// Any error that ended the run, [`SyncError::AlreadyRunning`], or
    /// [`SyncError::Internal`] if the run was cleared before completing.
    pub async fn sync(&self, on_file: FileCallback) -> Result<FileListing, SyncError> {
        let (tx, rx) = oneshot::channel();
        self.read_all_files(
            on_file,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        )?;

        rx.await
            .map_err(|_| SyncError::Internal("sync run was cleared".into()))?
    }

    /// Cancel the active run without invoking its completion.
    ///
    /// Stops polling, cancels in-flight downloads and discards callbacks.
    /// Safe to call when idle.
    pub fn clear_session_data(&self) {
        let mut active = self.shared.lock_active();
        if let Some(run) = active.take() {
            tracing::info!("Clearing sync run {}", run.id);
            run.task.abort();
            self.collaborators.downloads.cancel_all();
            self.collaborators.downloads.set_all_finished_handler(None);
            self.shared.running.store(false, Ordering::Release);
        }
    }

    /// Whether a run is active.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }
}

impl Drop for AllFilesReader {
    fn drop(&mut self) {
        self.clear_session_data();
    }
}

/// Results of asynchronous work started by a run.
enum Outcome {
    Listing(Result<FileListing, SyncError>),
    LocalData(Result<Vec<FileItem>, SyncError>),
}

/// The single owner of one run's state.
struct RunTask {
    id: u64,
    state: RunState,
    collaborators: Collaborators,
    config: Arc<ReaderConfig>,
    shared: Arc<Shared>,
    on_file: FileCallback,
    on_complete: Option<CompletionCallback>,
    started: Instant,
    /// The one outstanding poll timer deadline.
    next_tick: Option<Instant>,
    /// Session used by the latest poll; downloads are keyed by it.
    session: Option<Session>,
    completed: bool,
    work: JoinSet<Outcome>,
    events: mpsc::UnboundedReceiver<Event>,
    /// Keeps the event channel open for the lifetime of the run.
    _events_tx: mpsc::UnboundedSender<Event>,
}

impl RunTask {
    async fn drive(mut self) {
        tracing::info!(
            "Starting sync run {} for contract {}",
            self.id,
            self.config.contract.contract_id
        );
        self.handle(Event::Started);

        while !self.completed {
            let tick_armed = self.next_tick.is_some();
            let deadline = self.next_tick.unwrap_or_else(Instant::now);

            tokio::select! {
                _ = tokio::time::sleep_until(deadline), if tick_armed => {
                    self.next_tick = None;
                    self.handle(Event::Tick);
                }
                Some(event) = self.events.recv() => self.handle(event),
                Some(joined) = self.work.join_next() => {
                    let event = match joined {
                        Ok(Outcome::Listing(Ok(listing))) => Event::ListingReceived(listing),
                        Ok(Outcome::Listing(Err(error))) => Event::ListingFailed(error),
                        Ok(Outcome::LocalData(Ok(files))) => Event::LocalDataReceived(files),
                        Ok(Outcome::LocalData(Err(error))) => Event::LocalDataFailed(error),
                        Err(error) => Event::ListingFailed(SyncError::Internal(error.to_string())),
                    };
                    self.handle(event);
                }
            }
        }
    }

    fn handle(&mut self, event: Event) {
        if event == Event::Tick {
            tracing::debug!(
                "Sync state - {}",
                self.state.listing().map_or("unknown", |l| l.state().as_str())
            );
        }

        let ctx = EvalContext::new(
            self.started.elapsed(),
            self.collaborators.downloads.is_downloading(),
        );
        for action in self.state.on_event(event, ctx) {
            self.perform(action);
        }
    }

    fn perform(&mut self, action: Action) {
        if self.completed {
            return;
        }

        match action {
            Action::Poll => self.poll(),
            Action::ScheduleTick => {
                self.next_tick = Some(Instant::now() + self.state.limits().poll_interval)
            }
            Action::FetchLocalData => self.fetch_local_data(),
            Action::Download(items) => self.download(items),
            Action::ReportError(error) => {
                if let Some(sink) = self
                    .collaborators
                    .local
                    .as_ref()
                    .and_then(|local| local.error_sink.as_ref())
                {
                    sink.report(&error);
                }
            }
            Action::Complete(result) => self.complete(result),
        }
    }

    fn poll(&mut self) {
        let config = Arc::clone(&self.config);
        let contract_id = &config.contract.contract_id;

        let Some(session) = self
            .collaborators
            .sessions
            .get(contract_id)
            .filter(Session::is_valid)
        else {
            tracing::warn!("No valid session for contract {}", contract_id);
            self.handle(Event::SessionInvalid);
            return;
        };

        self.session = Some(session.clone());
        let listing = Arc::clone(&self.collaborators.listing);
        self.work
            .spawn(async move { Outcome::Listing(listing.fetch(&session).await) });
    }

    fn download(&mut self, items: Vec<FileItem>) {
        let Some(session) = self.session.clone().filter(Session::is_valid) else {
            self.handle(Event::SessionInvalid);
            return;
        };

        tracing::info!("Found new files to sync: {}", items.len());
        for item in items {
            tracing::debug!("Adding file to download queue: {}", item.name);
            self.collaborators.downloads.enqueue(
                DownloadRequest {
                    file_id: item.name,
                    session_key: session.key.clone(),
                    updated_date: item.updated_date,
                },
                Arc::clone(&self.on_file),
            );
        }
    }

    fn fetch_local_data(&mut self) {
        let Some(local) = self.collaborators.local.clone() else {
            self.handle(Event::LocalDataFailed(SyncError::DeviceData(
                "no device data service configured".into(),
            )));
            return;
        };

        let config = Arc::clone(&self.config);
        let on_file = Arc::clone(&self.on_file);
        tracing::info!(
            "Fetching device data for contract {}",
            config.contract.contract_id
        );

        self.work
            .spawn(async move { Outcome::LocalData(collect_local_data(local, config, on_file).await) });
    }

    fn complete(&mut self, result: Result<FileListing, SyncError>) {
        self.completed = true;
        self.next_tick = None;
        self.work.abort_all();

        match &result {
            Ok(listing) => tracing::info!(
                "Finished fetching session data: {} files ({})",
                listing.files.len(),
                listing.state()
            ),
            Err(error) if error.is_timeout() => {
                tracing::warn!("Sync run {} gave up: {}", self.id, error)
            }
            Err(error) => tracing::error!("Sync run {} failed: {}", self.id, error),
        }

        let owned = {
            let mut active = self.shared.lock_active();
            if active.as_ref().map(|run| run.id) == Some(self.id) {
                self.collaborators.downloads.cancel_all();
                self.collaborators.downloads.set_all_finished_handler(None);
                *active = None;
                self.shared.running.store(false, Ordering::Release);
                true
            } else {
                false
            }
        };

        if !owned {
            tracing::debug!("Sync run {} was cleared before completing", self.id);
            return;
        }

        if let Some(on_complete) = self.on_complete.take() {
            on_complete(result);
        }
    }
}

async fn collect_local_data(
    local: LocalData,
    config: Arc<ReaderConfig>,
    on_file: FileCallback,
) -> Result<Vec<FileItem>, SyncError> {
    let contract = &config.contract;
    // A configured scope overrides the resolver's own options
    let limits = match config.read_options() {
        Some(options) => {
            local
                .resolver
                .limits_with(&contract.app_id, &contract.contract_id, Some(&options))
                .await?
        }
        None => local.resolver.limits(&contract.app_id, &contract.contract_id).await?,
    };
    tracing::debug!(
        "Querying device data between {} and {}",
        limits.start,
        limits.end
    );
    local.service.query(limits.start, limits.end, on_file).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollingConfig;
    use crate::device::{MockDeviceData, RecordingErrorSink};
    use crate::download::MockDownloadEngine;
    use crate::remote::{MockCertificateService, MockListingClient, StaticTokenMinter};
    use crate::store::{MemoryRangeCache, MemorySessionStore};
    use session_sync_core::Certificate;
    use session_sync_types::{SyncState, TimeRange};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    const CONTRACT: &str = "contract-1";

    struct Harness {
        listing: MockListingClient,
        downloads: MockDownloadEngine,
        sessions: MemorySessionStore,
        files: Arc<Mutex<Vec<String>>>,
    }

    impl Harness {
        fn new(downloads: MockDownloadEngine) -> Self {
            let sessions = MemorySessionStore::new();
            sessions.set(CONTRACT, Session::new("session-key"));
            Self {
                listing: MockListingClient::new(),
                downloads,
                sessions,
                files: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn collaborators(&self) -> Collaborators {
            Collaborators::new(
                Arc::new(self.listing.clone()),
                Arc::new(self.downloads.clone()),
                Arc::new(self.sessions.clone()),
            )
        }

        fn reader(&self, config: ReaderConfig) -> AllFilesReader {
            AllFilesReader::new(self.collaborators(), config)
        }

        fn on_file(&self) -> FileCallback {
            let files = Arc::clone(&self.files);
            Arc::new(move |result| {
                if let Ok(file) = result {
                    files.lock().unwrap().push(file.id);
                }
            })
        }

        fn files(&self) -> Vec<String> {
            self.files.lock().unwrap().clone()
        }
    }

    fn config() -> ReaderConfig {
        ReaderConfig::new("app-1", CONTRACT)
    }

    fn config_with(polling: PollingConfig) -> ReaderConfig {
        config().with_polling(polling)
    }

    fn items(names: &[&str]) -> Vec<FileItem> {
        names.iter().map(|n| FileItem::new(*n, 1)).collect()
    }

    fn listing(names: &[&str], state: SyncState) -> FileListing {
        FileListing::new(items(names), state)
    }

    fn local_data(service: MockDeviceData, sink: RecordingErrorSink) -> LocalData {
        local_data_minted_by(StaticTokenMinter::new("jwt"), service, sink)
    }

    fn local_data_minted_by(
        tokens: StaticTokenMinter,
        service: MockDeviceData,
        sink: RecordingErrorSink,
    ) -> LocalData {
        let certificate = Certificate {
            contract_id: CONTRACT.into(),
            time_ranges: vec![TimeRange::Between { from: 100, to: 200 }],
        };
        let resolver = ContractTimeRangeResolver::new(
            Arc::new(tokens),
            Arc::new(MockCertificateService::new(certificate)),
            Arc::new(MemoryRangeCache::new()),
        );
        LocalData {
            resolver: Arc::new(resolver),
            service: Arc::new(service),
            error_sink: Some(Arc::new(sink)),
        }
    }

    // ===========================================
    // Entry and re-entrancy
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn invalid_session_fails_immediately() {
        let harness = Harness::new(MockDownloadEngine::held());
        harness.sessions.remove(CONTRACT);
        let reader = harness.reader(config());

        let result = reader.sync(harness.on_file()).await;

        assert_eq!(result, Err(SyncError::InvalidSession));
        assert!(harness.downloads.requests().is_empty());
        assert_eq!(harness.listing.fetch_count(), 0);
        assert!(!reader.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_session_is_invalid() {
        let harness = Harness::new(MockDownloadEngine::held());
        harness
            .sessions
            .set(CONTRACT, Session::new("session-key").with_expiry(1));
        let reader = harness.reader(config());

        let result = reader.sync(harness.on_file()).await;
        assert_eq!(result, Err(SyncError::InvalidSession));
    }

    #[tokio::test(start_paused = true)]
    async fn second_run_is_rejected_while_active() {
        let harness = Harness::new(MockDownloadEngine::held());
        harness
            .listing
            .set_fallback(listing(&["a"], SyncState::Running));
        let reader = harness.reader(config());

        let completions = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&completions);
        reader
            .read_all_files(
                harness.on_file(),
                Box::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        tokio::time::sleep(Duration::from_secs(4)).await;
        let polls_before = harness.listing.fetch_count();

        let second = reader.read_all_files(harness.on_file(), Box::new(|_| {}));
        assert_eq!(second, Err(SyncError::AlreadyRunning));

        // The first run keeps polling undisturbed
        assert!(reader.is_running());
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(harness.listing.fetch_count() > polls_before);
        assert_eq!(completions.load(Ordering::SeqCst), 0);
        assert_eq!(harness.downloads.requests().len(), 1);

        reader.clear_session_data();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_starts_admit_exactly_one_run() {
        let harness = Harness::new(MockDownloadEngine::held());
        harness
            .listing
            .set_fallback(listing(&[], SyncState::Running));
        let reader = Arc::new(harness.reader(config()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let reader = Arc::clone(&reader);
            let on_file = harness.on_file();
            handles.push(tokio::spawn(async move {
                reader.read_all_files(on_file, Box::new(|_| {})).is_ok()
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);

        reader.clear_session_data();
    }

    // ===========================================
    // Happy path
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn downloads_new_items_then_completes() {
        let harness = Harness::new(MockDownloadEngine::auto(Duration::from_secs(1)));
        harness
            .listing
            .queue(Ok(listing(&["a", "b", "c"], SyncState::Running)));
        harness
            .listing
            .set_fallback(listing(&["a", "b", "c"], SyncState::Completed));
        let reader = harness.reader(config());

        let result = reader.sync(harness.on_file()).await.unwrap();

        assert_eq!(result, listing(&["a", "b", "c"], SyncState::Completed));
        let mut files = harness.files();
        files.sort();
        assert_eq!(files, vec!["a", "b", "c"]);

        let requests = harness.downloads.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|r| r.session_key == "session-key"));
        assert!(requests.iter().all(|r| r.updated_date == 1));
        assert!(!reader.is_running());
        assert!(!harness.downloads.has_handler());
    }

    #[tokio::test(start_paused = true)]
    async fn changed_item_is_downloaded_again() {
        let harness = Harness::new(MockDownloadEngine::auto(Duration::from_secs(1)));
        harness
            .listing
            .queue(Ok(listing(&["a"], SyncState::Running)));
        harness.listing.queue(Ok(FileListing::new(
            vec![FileItem::new("a", 2)],
            SyncState::Completed,
        )));
        let reader = harness.reader(config());

        let result = reader.sync(harness.on_file()).await.unwrap();

        assert_eq!(result.files, vec![FileItem::new("a", 2)]);
        let updated: Vec<u64> = harness
            .downloads
            .requests()
            .iter()
            .map(|r| r.updated_date)
            .collect();
        assert_eq!(updated, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn next_run_starts_from_clean_slate() {
        let harness = Harness::new(MockDownloadEngine::auto(Duration::from_secs(1)));
        harness
            .listing
            .set_fallback(listing(&["a"], SyncState::Completed));
        let reader = harness.reader(config());

        reader.sync(harness.on_file()).await.unwrap();
        let second = reader.sync(harness.on_file()).await.unwrap();

        assert_eq!(second, listing(&["a"], SyncState::Completed));
        // Queued-item set was reset, so the item is fetched again
        assert_eq!(harness.downloads.requests().len(), 2);
    }

    // ===========================================
    // Termination ceilings
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn identical_listings_time_out() {
        let harness = Harness::new(MockDownloadEngine::held());
        harness
            .listing
            .set_fallback(listing(&[], SyncState::Running));
        let reader = harness.reader(config_with(PollingConfig {
            max_duration_secs: 3600,
            ..PollingConfig::default()
        }));

        let result = reader.sync(harness.on_file()).await;

        assert_eq!(result, Err(SyncError::ListingPollingTimeout));
        // One initial poll plus 100 unchanged ones
        assert_eq!(harness.listing.fetch_count(), 101);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_status_times_out() {
        let harness = Harness::new(MockDownloadEngine::held());
        harness
            .listing
            .set_fallback(listing(&[], SyncState::Pending));
        let reader = harness.reader(config());
        let started = Instant::now();

        let result = reader.sync(harness.on_file()).await;

        assert_eq!(result, Err(SyncError::SyncPendingTimeout));
        assert_eq!(started.elapsed(), Duration::from_secs(60));
        assert!(harness.downloads.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn long_run_times_out_even_when_healthy() {
        let harness = Harness::new(MockDownloadEngine::held());
        harness
            .listing
            .set_fallback(listing(&["a"], SyncState::Running));
        let reader = harness.reader(config_with(PollingConfig {
            max_stale_polls: 10_000,
            ..PollingConfig::default()
        }));

        let result = reader.sync(harness.on_file()).await;

        assert_eq!(result, Err(SyncError::SyncTimeout));
        // Held download is cancelled by the reset
        assert!(harness.downloads.cancel_count() >= 1);
        assert!(!harness.downloads.is_downloading());
    }

    // ===========================================
    // Soft errors
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn listing_failure_without_downloads_ends_run() {
        let harness = Harness::new(MockDownloadEngine::held());
        harness
            .listing
            .queue(Err(SyncError::Network("unreachable".into())));
        let reader = harness.reader(config());

        let result = reader.sync(harness.on_file()).await;
        assert_eq!(result, Err(SyncError::Network("unreachable".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn listing_failure_waits_for_downloads() {
        let harness = Harness::new(MockDownloadEngine::auto(Duration::from_secs(5)));
        harness
            .listing
            .queue(Ok(listing(&["a"], SyncState::Running)));
        harness
            .listing
            .queue(Err(SyncError::Network("reset".into())));
        let reader = harness.reader(config());
        let started = Instant::now();

        let result = reader.sync(harness.on_file()).await;

        assert_eq!(result, Err(SyncError::Network("reset".into())));
        // Delivered once the download finished, not at the failed poll
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        assert_eq!(harness.files(), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn later_successful_poll_supersedes_soft_error() {
        let harness = Harness::new(MockDownloadEngine::auto(Duration::from_secs(7)));
        harness
            .listing
            .queue(Ok(listing(&["a"], SyncState::Running)));
        harness
            .listing
            .queue(Err(SyncError::Network("reset".into())));
        harness
            .listing
            .queue(Ok(listing(&["a"], SyncState::Completed)));
        let reader = harness.reader(config());

        let result = reader.sync(harness.on_file()).await;
        assert_eq!(result, Ok(listing(&["a"], SyncState::Completed)));
    }

    // ===========================================
    // Device-local data
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn local_items_are_appended_after_remote_completes() {
        let harness = Harness::new(MockDownloadEngine::auto(Duration::from_secs(1)));
        harness
            .listing
            .queue(Ok(listing(&["remote"], SyncState::Running)));
        harness
            .listing
            .set_fallback(listing(&["remote"], SyncState::Completed));
        let device = MockDeviceData::new(items(&["local"])).with_latency(Duration::from_secs(10));
        let sink = RecordingErrorSink::new();
        let reader = AllFilesReader::new(
            harness
                .collaborators()
                .with_local_data(local_data(device.clone(), sink.clone())),
            config().with_device_data(true),
        );

        let result = reader.sync(harness.on_file()).await.unwrap();

        assert_eq!(result, listing(&["remote", "local"], SyncState::Completed));
        assert_eq!(device.queries(), vec![(100, 200)]);
        let mut files = harness.files();
        files.sort();
        assert_eq!(files, vec!["local", "remote"]);
        assert!(sink.errors().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn configured_scope_narrows_device_query() {
        let harness = Harness::new(MockDownloadEngine::held());
        harness
            .listing
            .set_fallback(listing(&[], SyncState::Completed));
        let device = MockDeviceData::new(items(&["local"]));
        let reader = AllFilesReader::new(
            harness
                .collaborators()
                .with_local_data(local_data(device.clone(), RecordingErrorSink::new())),
            config()
                .with_device_data(true)
                .with_scope(TimeRange::Between { from: 150, to: 400 }),
        );

        let result = reader.sync(harness.on_file()).await.unwrap();

        assert_eq!(result, listing(&["local"], SyncState::Completed));
        assert_eq!(device.queries(), vec![(150, 200)]);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_remote_does_not_block_collected_local_data() {
        let harness = Harness::new(MockDownloadEngine::held());
        harness
            .listing
            .set_fallback(listing(&[], SyncState::Pending));
        let device = MockDeviceData::new(items(&["local"])).with_latency(Duration::from_secs(2));
        let reader = AllFilesReader::new(
            harness
                .collaborators()
                .with_local_data(local_data(device, RecordingErrorSink::new())),
            config().with_device_data(true),
        );

        let result = reader.sync(harness.on_file()).await.unwrap();
        assert_eq!(result, listing(&["local"], SyncState::Pending));
    }

    #[tokio::test(start_paused = true)]
    async fn device_data_failure_is_reported_and_ends_run() {
        let harness = Harness::new(MockDownloadEngine::held());
        harness
            .listing
            .set_fallback(listing(&[], SyncState::Running));
        let err = SyncError::DeviceData("permission denied".into());
        let sink = RecordingErrorSink::new();
        let reader = AllFilesReader::new(
            harness.collaborators().with_local_data(local_data(
                MockDeviceData::failing(err.clone()),
                sink.clone(),
            )),
            config().with_device_data(true),
        );

        let result = reader.sync(harness.on_file()).await;

        assert_eq!(result, Err(err.clone()));
        assert_eq!(sink.errors(), vec![err]);
        assert!(!reader.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn range_resolution_failure_is_reported_and_ends_run() {
        let harness = Harness::new(MockDownloadEngine::held());
        harness
            .listing
            .set_fallback(listing(&[], SyncState::Running));
        let device = MockDeviceData::new(items(&["local"]));
        let sink = RecordingErrorSink::new();
        let reader = AllFilesReader::new(
            harness.collaborators().with_local_data(local_data_minted_by(
                StaticTokenMinter::failing(),
                device.clone(),
                sink.clone(),
            )),
            config().with_device_data(true),
        );

        let result = reader.sync(harness.on_file()).await;

        assert_eq!(result, Err(SyncError::TokenCreationFailed));
        assert_eq!(sink.errors(), vec![SyncError::TokenCreationFailed]);
        // The device is never queried without a resolved window
        assert!(device.queries().is_empty());
        assert!(harness.files().is_empty());
        assert!(!reader.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn inverted_scope_fails_without_querying_device() {
        let harness = Harness::new(MockDownloadEngine::held());
        harness
            .listing
            .set_fallback(listing(&[], SyncState::Running));
        let device = MockDeviceData::new(items(&["local"]));
        let sink = RecordingErrorSink::new();
        let reader = AllFilesReader::new(
            harness
                .collaborators()
                .with_local_data(local_data(device.clone(), sink.clone())),
            config()
                .with_device_data(true)
                .with_scope(TimeRange::Between { from: 180, to: 120 }),
        );

        let result = reader.sync(harness.on_file()).await;

        assert!(matches!(result, Err(SyncError::InvalidTimeRange(_))));
        assert_eq!(sink.errors().len(), 1);
        assert!(device.queries().is_empty());
    }

    // ===========================================
    // Cancellation
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn clear_session_data_discards_run() {
        let harness = Harness::new(MockDownloadEngine::held());
        harness
            .listing
            .set_fallback(listing(&["a"], SyncState::Running));
        let reader = harness.reader(config());

        let completions = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&completions);
        reader
            .read_all_files(
                harness.on_file(),
                Box::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        reader.clear_session_data();
        assert!(!reader.is_running());
        assert!(!harness.downloads.has_handler());
        assert!(!harness.downloads.is_downloading());
        let polls = harness.listing.fetch_count();

        // A late timer fire against the cleared run does nothing
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(harness.listing.fetch_count(), polls);
        assert_eq!(completions.load(Ordering::SeqCst), 0);

        // Idempotent, and the reader accepts a fresh run
        reader.clear_session_data();
        harness
            .listing
            .set_fallback(listing(&[], SyncState::Completed));
        let result = reader.sync(harness.on_file()).await;
        assert_eq!(result, Ok(listing(&[], SyncState::Completed)));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_when_idle_is_a_no_op() {
        let harness = Harness::new(MockDownloadEngine::held());
        let reader = harness.reader(config());
        reader.clear_session_data();
        reader.clear_session_data();
        assert!(!reader.is_running());
        assert_eq!(harness.downloads.cancel_count(), 0);
    }
}
