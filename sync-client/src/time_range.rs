//! Contract time-range resolution.
//!
//! Resolves the window of device-local data a contract may collect. The
//! first resolution for a contract fetches and parses its certificate; the
//! resulting range is cached so later runs resolve without any network
//! round trip.

use crate::remote::{CertificateService, TokenMinter};
use crate::store::ContractRangeCache;
use session_sync_core::resolve_limits;
use session_sync_types::{ReadOptions, SyncError, TimeRangeLimits};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Resolves [`TimeRangeLimits`] for a contract, caching certificate ranges.
pub struct ContractTimeRangeResolver {
    tokens: Arc<dyn TokenMinter>,
    certificates: Arc<dyn CertificateService>,
    cache: Arc<dyn ContractRangeCache>,
    options: Option<ReadOptions>,
}

impl ContractTimeRangeResolver {
    /// Create a resolver over the given collaborators.
    pub fn new(
        tokens: Arc<dyn TokenMinter>,
        certificates: Arc<dyn CertificateService>,
        cache: Arc<dyn ContractRangeCache>,
    ) -> Self {
        Self {
            tokens,
            certificates,
            cache,
            options: None,
        }
    }

    /// Apply caller read options when computing limits.
    pub fn with_options(mut self, options: Option<ReadOptions>) -> Self {
        self.options = options;
        self
    }

    /// Resolve the allowed window for `contract_id`.
    ///
    /// # Errors
    ///
    /// - [`SyncError::TokenCreationFailed`] if no token could be minted
    /// - any error from the certificate service
    /// - [`SyncError::InvalidTimeRange`] if the read options fall outside the
    ///   contract's range
    pub async fn limits(&self, app_id: &str, contract_id: &str) -> Result<TimeRangeLimits, SyncError> {
        self.limits_with(app_id, contract_id, self.options.as_ref()).await
    }

    /// Like [`limits`](Self::limits), narrowing by `options` instead of the
    /// resolver's own.
    pub async fn limits_with(
        &self,
        app_id: &str,
        contract_id: &str,
        options: Option<&ReadOptions>,
    ) -> Result<TimeRangeLimits, SyncError> {
        let now = unix_now_secs();

        if let Some(range) = self.cache.get(contract_id) {
            tracing::debug!("Using cached time range for contract {}", contract_id);
            return resolve_limits(Some(&range), options, now);
        }

        let token = self
            .tokens
            .basic_token(app_id, contract_id)
            .ok_or(SyncError::TokenCreationFailed)?;

        let certificate = self.certificates.fetch_and_parse(&token, contract_id).await?;

        if let Some(range) = certificate.time_range() {
            self.cache.put(contract_id, range);
        }

        certificate.resolve_limits(options, now)
    }
}

fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
