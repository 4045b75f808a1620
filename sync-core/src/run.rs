//! Run state machine for session-sync.
//!
//! This module provides a pure, side-effect-free state machine for one sync
//! run. Every trigger (timer fire, listing response, download batch finished,
//! local data collected) is fed in as an [`Event`]; the machine updates its
//! state and returns the [`Action`]s the caller must perform.
//!
//! The actual I/O (polling, downloading, querying device data, arming the
//! timer) is performed by sync-client, not by this module.
//!
//! A run ends with exactly one [`Action::Complete`]. After that the state is
//! cleared and every further event is ignored, so late timer fires or
//! responses belonging to a finished run cannot resurrect it.

use std::time::Duration;
use session_sync_types::{FileItem, FileListing, SyncError, SyncState};

use crate::diff::ItemDiffCache;
use crate::progress::{ProgressCounters, RunLimits};

/// Inputs to the run state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The run was started by `read_all_files`.
    Started,
    /// The poll timer fired.
    Tick,
    /// A listing request succeeded.
    ListingReceived(FileListing),
    /// A listing request failed.
    ListingFailed(SyncError),
    /// No valid session was available for a poll.
    SessionInvalid,
    /// The download engine reported that every queued download finished.
    DownloadsFinished,
    /// Device-local data was collected.
    LocalDataReceived(Vec<FileItem>),
    /// Collecting device-local data failed.
    LocalDataFailed(SyncError),
}

/// Instructions for the caller. These are not side effects; sync-client
/// interprets them and performs the actual I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Resolve the contract time range and query device-local data.
    FetchLocalData,
    /// Issue one listing request.
    Poll,
    /// Arm the poll timer for one more fire.
    ScheduleTick,
    /// Queue these newly discovered items for download.
    Download(Vec<FileItem>),
    /// Report a device-data failure to the error sink.
    ReportError(SyncError),
    /// Deliver the run's result to the completion callback.
    Complete(Result<FileListing, SyncError>),
}

/// Facts about the outside world at the moment an event is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvalContext {
    /// Time since the run started.
    pub elapsed: Duration,
    /// Whether the download engine has transfers in flight.
    pub downloading: bool,
}

impl EvalContext {
    /// Create a context.
    pub fn new(elapsed: Duration, downloading: bool) -> Self {
        Self {
            elapsed,
            downloading,
        }
    }
}

/// Mutable state of one sync run - NO I/O, just transitions.
#[derive(Debug, Clone)]
pub struct RunState {
    limits: RunLimits,
    /// The contract sources device-local data.
    local_requested: bool,
    /// A local-data fetch has been requested and not yet answered.
    local_in_flight: bool,
    local_files: Option<Vec<FileItem>>,
    listing: Option<FileListing>,
    counters: ProgressCounters,
    diff: ItemDiffCache,
    /// Transient failure waiting for in-flight downloads to drain.
    soft_error: Option<SyncError>,
    finished: bool,
}

impl RunState {
    /// Create the state for a new run.
    pub fn new(limits: RunLimits, local_requested: bool) -> Self {
        Self {
            limits,
            local_requested,
            local_in_flight: false,
            local_files: None,
            listing: None,
            counters: ProgressCounters::new(),
            diff: ItemDiffCache::new(),
            soft_error: None,
            finished: false,
        }
    }

    /// Process an event and return the actions to execute, in order.
    ///
    /// A finished run returns no actions for any event.
    pub fn on_event(&mut self, event: Event, ctx: EvalContext) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.finished {
            return actions;
        }

        match event {
            Event::Started => {
                if self.local_requested {
                    self.request_local_data(&mut actions);
                }
                actions.push(Action::Poll);
                actions.push(Action::ScheduleTick);
            }
            Event::Tick => self.evaluate(true, ctx, &mut actions),
            Event::DownloadsFinished => self.evaluate(false, ctx, &mut actions),
            Event::ListingReceived(listing) => self.on_listing(listing, ctx, &mut actions),
            Event::ListingFailed(error) => {
                if ctx.downloading {
                    // Let in-flight downloads finish; a later poll may clear it
                    self.soft_error = Some(error);
                } else {
                    self.complete(Some(error), &mut actions);
                }
            }
            Event::SessionInvalid => {
                self.complete(Some(SyncError::InvalidSession), &mut actions);
            }
            Event::LocalDataReceived(files) => {
                self.local_in_flight = false;
                self.local_files = Some(files);
                self.evaluate(false, ctx, &mut actions);
            }
            Event::LocalDataFailed(error) => {
                self.local_in_flight = false;
                actions.push(Action::ReportError(error.clone()));
                self.complete(Some(error), &mut actions);
            }
        }

        actions
    }

    fn on_listing(&mut self, listing: FileListing, ctx: EvalContext, actions: &mut Vec<Action>) {
        let changed = self.listing.as_ref() != Some(&listing);
        let stale = self.counters.record_listing(changed);
        if stale >= self.limits.max_stale_polls {
            self.complete(Some(SyncError::ListingPollingTimeout), actions);
            return;
        }

        self.soft_error = None;

        let fresh = self.diff.new_items(&listing.files);
        self.listing = Some(listing);

        let queued = !fresh.is_empty();
        if queued {
            self.diff.commit(&fresh);
            actions.push(Action::Download(fresh));
        }

        // Remote side just finished: decide now instead of on the next tick
        if changed && !self.is_running() {
            let ctx = EvalContext::new(ctx.elapsed, ctx.downloading || queued);
            self.evaluate(false, ctx, actions);
        }
    }

    fn evaluate(&mut self, from_timer: bool, ctx: EvalContext, actions: &mut Vec<Action>) {
        let pending = self
            .listing
            .as_ref()
            .map_or(false, |l| l.state() == SyncState::Pending);
        let pending_count = self.counters.record_status(pending);
        if pending && pending_count >= self.limits.max_pending_evaluations {
            self.complete(Some(SyncError::SyncPendingTimeout), actions);
            return;
        }

        if ctx.elapsed > self.limits.max_sync_duration {
            self.complete(Some(SyncError::SyncTimeout), actions);
            return;
        }

        let running = self.is_running();
        if (self.soft_error.is_some() || !running) && !ctx.downloading {
            let error = self.soft_error.clone();
            if self.complete(error, actions) {
                return;
            }
        }

        if from_timer {
            actions.push(Action::ScheduleTick);
        }

        // Soft error deliberately ignored: downloads are still running, and
        // another poll may clear it.
        if running {
            actions.push(Action::Poll);
        }
    }

    /// Whether the run should keep waiting on the remote side.
    ///
    /// No listing yet counts as running. A pending remote status is ignored
    /// only when the contract sources device-local data and that data has
    /// already been collected.
    pub fn is_running(&self) -> bool {
        let state = self.listing.as_ref().map(FileListing::state);
        if self.local_requested && self.local_files.is_some() && state == Some(SyncState::Pending) {
            return false;
        }
        state.map_or(true, |s| s.is_running())
    }

    /// Terminate the run. Returns false when completion was deferred because
    /// local data is still outstanding.
    fn complete(&mut self, error: Option<SyncError>, actions: &mut Vec<Action>) -> bool {
        let result = match error {
            Some(error) => Err(error),
            None => match (&self.local_files, &self.listing) {
                (Some(local), listing) => Ok(listing
                    .clone()
                    .unwrap_or_else(|| FileListing::empty(SyncState::Completed))
                    .merged_with(local)),
                (None, _) if self.local_requested => {
                    if !self.local_in_flight {
                        self.request_local_data(actions);
                    }
                    return false;
                }
                (None, Some(listing)) => Ok(listing.clone()),
                (None, None) => Ok(FileListing::empty(SyncState::Completed)),
            },
        };

        self.finish();
        actions.push(Action::Complete(result));
        true
    }

    fn request_local_data(&mut self, actions: &mut Vec<Action>) {
        self.local_in_flight = true;
        actions.push(Action::FetchLocalData);
    }

    fn finish(&mut self) {
        self.finished = true;
        self.local_in_flight = false;
        self.local_files = None;
        self.listing = None;
        self.counters.reset();
        self.diff.reset();
        self.soft_error = None;
    }

    /// Whether the run has delivered its completion.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Last listing received, if any.
    pub fn listing(&self) -> Option<&FileListing> {
        self.listing.as_ref()
    }

    /// Current progress counters.
    pub fn counters(&self) -> &ProgressCounters {
        &self.counters
    }

    /// Items already queued for download.
    pub fn queued(&self) -> &ItemDiffCache {
        &self.diff
    }

    /// Recorded soft error, if any.
    pub fn soft_error(&self) -> Option<&SyncError> {
        self.soft_error.as_ref()
    }

    /// Limits this run enforces.
    pub fn limits(&self) -> &RunLimits {
        &self.limits
    }
}
