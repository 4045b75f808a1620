//! Contract time constraints for device-local data.
//!
//! All instants are epoch seconds.

use serde::{Deserialize, Serialize};

/// A time range as declared by a contract or requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimeRange {
    /// Everything from `from` onwards.
    After {
        /// Start instant.
        from: u64,
    },
    /// Everything up to `to`.
    Until {
        /// End instant.
        to: u64,
    },
    /// Everything between `from` and `to`.
    Between {
        /// Start instant.
        from: u64,
        /// End instant.
        to: u64,
    },
    /// A trailing window ending now.
    Last {
        /// Window length in seconds.
        secs: u64,
    },
}

impl TimeRange {
    /// Concrete `[start, end]` bounds of this range as seen at `now`.
    ///
    /// The end never lies in the future.
    pub fn bounds(&self, now: u64) -> TimeRangeLimits {
        match *self {
            Self::After { from } => TimeRangeLimits::new(from, now),
            Self::Until { to } => TimeRangeLimits::new(0, to.min(now)),
            Self::Between { from, to } => TimeRangeLimits::new(from, to.min(now)),
            Self::Last { secs } => TimeRangeLimits::new(now.saturating_sub(secs), now),
        }
    }
}

/// Resolved start/end bounding which device-local data may be collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRangeLimits {
    /// Inclusive start instant.
    pub start: u64,
    /// Inclusive end instant.
    pub end: u64,
}

impl TimeRangeLimits {
    /// Create limits from explicit bounds.
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Unbounded start, ending at `now`.
    pub fn until_now(now: u64) -> Self {
        Self::new(0, now)
    }

    /// Overlap of two limits, or `None` when they are disjoint.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(Self::new(start, end))
    }
}

/// Caller options applied when resolving a contract's limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOptions {
    /// Narrows the contract range to this window.
    pub scope: Option<TimeRange>,
}

impl ReadOptions {
    /// Options restricting collection to `scope`.
    pub fn scoped(scope: TimeRange) -> Self {
        Self { scope: Some(scope) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    #[test]
    fn bounds_clamp_to_now() {
        assert_eq!(
            TimeRange::After { from: 100 }.bounds(NOW),
            TimeRangeLimits::new(100, NOW)
        );
        assert_eq!(
            TimeRange::Until { to: NOW + 50 }.bounds(NOW),
            TimeRangeLimits::new(0, NOW)
        );
        assert_eq!(
            TimeRange::Between { from: 10, to: 20 }.bounds(NOW),
            TimeRangeLimits::new(10, 20)
        );
        assert_eq!(
            TimeRange::Last { secs: 3600 }.bounds(NOW),
            TimeRangeLimits::new(NOW - 3600, NOW)
        );
    }

    #[test]
    fn intersect_overlapping_and_disjoint() {
        let a = TimeRangeLimits::new(0, 100);
        let b = TimeRangeLimits::new(50, 200);
        assert_eq!(a.intersect(&b), Some(TimeRangeLimits::new(50, 100)));
        assert_eq!(a.intersect(&TimeRangeLimits::new(101, 200)), None);
    }

    #[test]
    fn time_range_json_is_tagged() {
        let range: TimeRange = serde_json::from_str(r#"{"type":"last","secs":86400}"#).unwrap();
        assert_eq!(range, TimeRange::Last { secs: 86400 });
    }
}
