//! Time-range limit resolution for device-local data.
//!
//! A contract declares which window of device data it may collect; the
//! caller may narrow that window through [`ReadOptions`]. Resolution is a
//! pure function of the contract range, the options and `now`.

use serde::{Deserialize, Serialize};
use session_sync_types::{ReadOptions, SyncError, TimeRange, TimeRangeLimits};

/// The parts of a parsed contract certificate this crate cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    /// Contract the certificate belongs to.
    pub contract_id: String,
    /// Time ranges the contract's data request is constrained to.
    #[serde(default)]
    pub time_ranges: Vec<TimeRange>,
}

impl Certificate {
    /// The range that governs device-local collection (the first declared one).
    pub fn time_range(&self) -> Option<TimeRange> {
        self.time_ranges.first().copied()
    }

    /// Resolve collection limits for this contract at `now` (epoch seconds).
    pub fn resolve_limits(
        &self,
        options: Option<&ReadOptions>,
        now: u64,
    ) -> Result<TimeRangeLimits, SyncError> {
        resolve_limits(self.time_range().as_ref(), options, now)
    }
}

/// Compute limits from a contract range and optional caller scope.
///
/// Without a contract range, everything up to `now` is allowed. A caller
/// scope is intersected with the contract bounds.
///
/// # Errors
///
/// Returns [`SyncError::InvalidTimeRange`] when either the contract range or
/// the requested scope is empty at `now` (start after end), or when the
/// scope does not overlap the contract's range.
pub fn resolve_limits(
    contract: Option<&TimeRange>,
    options: Option<&ReadOptions>,
    now: u64,
) -> Result<TimeRangeLimits, SyncError> {
    let allowed = match contract {
        Some(range) => non_empty(range.bounds(now), "contract")?,
        None => TimeRangeLimits::until_now(now),
    };

    let Some(scope) = options.and_then(|o| o.scope.as_ref()) else {
        return Ok(allowed);
    };

    let requested = non_empty(scope.bounds(now), "requested")?;
    allowed.intersect(&requested).ok_or_else(|| {
        SyncError::InvalidTimeRange(format!(
            "requested {}..{} is outside contract range {}..{}",
            requested.start, requested.end, allowed.start, allowed.end
        ))
    })
}

fn non_empty(limits: TimeRangeLimits, what: &str) -> Result<TimeRangeLimits, SyncError> {
    if limits.start > limits.end {
        return Err(SyncError::InvalidTimeRange(format!(
            "{} range {}..{} is empty",
            what, limits.start, limits.end
        )));
    }
    Ok(limits)
}
