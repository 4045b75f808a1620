//! Remote session handle.

/// A previously opened remote session, scoped to one contract.
///
/// Owned by an external session store; the orchestrator only reads it.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque session key sent with listing and download requests.
    pub key: String,
    /// Expiry instant in epoch milliseconds (`None` = never expires).
    pub expires_at: Option<u64>,
}

impl Session {
    /// Create a session that never expires.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            expires_at: None,
        }
    }

    /// Set the expiry instant.
    pub fn with_expiry(mut self, expires_at: u64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Check validity at the given instant (epoch milliseconds).
    pub fn is_valid_at(&self, now_millis: u64) -> bool {
        !self.key.is_empty() && self.expires_at.map_or(true, |exp| now_millis < exp)
    }

    /// Check validity against the system clock.
    pub fn is_valid(&self) -> bool {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.is_valid_at(now)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("key", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_without_expiry_is_valid() {
        assert!(Session::new("abc").is_valid_at(u64::MAX - 1));
        assert!(Session::new("abc").is_valid());
    }

    #[test]
    fn expired_session_is_invalid() {
        let session = Session::new("abc").with_expiry(1_000);
        assert!(session.is_valid_at(999));
        assert!(!session.is_valid_at(1_000));
    }

    #[test]
    fn empty_key_is_invalid() {
        assert!(!Session::new("").is_valid_at(0));
    }

    #[test]
    fn debug_redacts_key() {
        let debug = format!("{:?}", Session::new("super-secret"));
        assert!(!debug.contains("super-secret"));
    }
}
