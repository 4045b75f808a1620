//! Session store and contract time-range cache.
//!
//! Both are owned outside the files reader and injected into it. The
//! in-memory implementations here back tests and simple embeddings.

use dashmap::DashMap;
use session_sync_types::{Session, TimeRange};
use std::sync::Arc;

/// Read access to the session opened for a contract.
pub trait SessionStore: Send + Sync {
    /// Current session for `contract_id`, if any.
    fn get(&self, contract_id: &str) -> Option<Session>;
}

/// Per-contract cache of resolved certificate time ranges.
///
/// Append-only: once a contract's range is cached it is never replaced.
pub trait ContractRangeCache: Send + Sync {
    /// Cached range for `contract_id`.
    fn get(&self, contract_id: &str) -> Option<TimeRange>;

    /// Cache `range` for `contract_id` unless one is already present.
    fn put(&self, contract_id: &str, range: TimeRange);
}

/// Concurrent in-memory session store.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<DashMap<String, Session>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session for a contract.
    pub fn set(&self, contract_id: &str, session: Session) {
        self.sessions.insert(contract_id.to_string(), session);
    }

    /// Remove the session for a contract.
    pub fn remove(&self, contract_id: &str) {
        self.sessions.remove(contract_id);
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, contract_id: &str) -> Option<Session> {
        self.sessions.get(contract_id).map(|s| s.value().clone())
    }
}

/// Concurrent in-memory time-range cache.
#[derive(Debug, Clone, Default)]
pub struct MemoryRangeCache {
    ranges: Arc<DashMap<String, TimeRange>>,
}

impl MemoryRangeCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached contracts.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl ContractRangeCache for MemoryRangeCache {
    fn get(&self, contract_id: &str) -> Option<TimeRange> {
        self.ranges.get(contract_id).map(|r| *r.value())
    }

    fn put(&self, contract_id: &str, range: TimeRange) {
        self.ranges.entry(contract_id.to_string()).or_insert(range);
    }
}
