//! Progress counters for a sync run.
//!
//! Pure bookkeeping: consecutive unchanged polls, consecutive pending
//! evaluations, and the instant the run started. The run state machine
//! compares these against [`RunLimits`] to decide on the counter-based
//! timeouts.

use std::time::Duration;

/// Default interval between poll timer fires.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default ceiling of consecutive unchanged listings.
pub const DEFAULT_MAX_STALE_POLLS: u32 = 100;

/// Default ceiling of consecutive evaluations with a pending status.
pub const DEFAULT_MAX_PENDING_EVALUATIONS: u32 = 20;

/// Default ceiling on the total duration of a run.
pub const DEFAULT_MAX_SYNC_DURATION: Duration = Duration::from_secs(5 * 60);

/// Termination ceilings and the poll cadence of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    /// Interval between poll timer fires.
    pub poll_interval: Duration,
    /// Unchanged polls before `ListingPollingTimeout`.
    pub max_stale_polls: u32,
    /// Pending evaluations before `SyncPendingTimeout`.
    pub max_pending_evaluations: u32,
    /// Elapsed time beyond which the run fails with `SyncTimeout`.
    pub max_sync_duration: Duration,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_stale_polls: DEFAULT_MAX_STALE_POLLS,
            max_pending_evaluations: DEFAULT_MAX_PENDING_EVALUATIONS,
            max_sync_duration: DEFAULT_MAX_SYNC_DURATION,
        }
    }
}

/// Stale-poll counter, pending-status counter and elapsed time of a run.
///
/// Elapsed time is supplied by the caller rather than read from a clock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressCounters {
    stale_polls: u32,
    pending_evaluations: u32,
}

impl ProgressCounters {
    /// Fresh counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a poll result. Unchanged listings increment the stale counter,
    /// a changed listing resets it. Returns the new count.
    pub fn record_listing(&mut self, changed: bool) -> u32 {
        if changed {
            self.stale_polls = 0;
        } else {
            self.stale_polls = self.stale_polls.saturating_add(1);
        }
        self.stale_polls
    }

    /// Record an evaluation. A pending status increments the pending
    /// counter, anything else resets it. Returns the new count.
    pub fn record_status(&mut self, pending: bool) -> u32 {
        if pending {
            self.pending_evaluations = self.pending_evaluations.saturating_add(1);
        } else {
            self.pending_evaluations = 0;
        }
        self.pending_evaluations
    }

    /// Current consecutive unchanged polls.
    pub fn stale_polls(&self) -> u32 {
        self.stale_polls
    }

    /// Current consecutive pending evaluations.
    pub fn pending_evaluations(&self) -> u32 {
        self.pending_evaluations
    }

    /// Zero both counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
