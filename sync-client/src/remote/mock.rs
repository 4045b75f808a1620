//! Mock remote collaborators for testing.
//!
//! Allows queueing responses and counting requests for verification.

use super::{CertificateService, ListingClient, TokenMinter};
use async_trait::async_trait;
use session_sync_core::Certificate;
use session_sync_types::{FileListing, Session, SyncError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock listing endpoint.
///
/// Returns queued responses in order. Once the queue is drained, the
/// fallback listing (if set) is returned on every further call.
#[derive(Debug, Default, Clone)]
pub struct MockListingClient {
    inner: Arc<Mutex<MockListingInner>>,
}

#[derive(Debug, Default)]
struct MockListingInner {
    responses: VecDeque<Result<FileListing, SyncError>>,
    fallback: Option<FileListing>,
    latency: Option<Duration>,
    fetch_count: usize,
    session_keys: Vec<String>,
}

impl MockListingClient {
    /// Create a new mock with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for a future `fetch()`.
    pub fn queue(&self, response: Result<FileListing, SyncError>) {
        let mut inner = self.inner.lock().unwrap();
        inner.responses.push_back(response);
    }

    /// Listing returned whenever the queue is empty.
    pub fn set_fallback(&self, listing: FileListing) {
        let mut inner = self.inner.lock().unwrap();
        inner.fallback = Some(listing);
    }

    /// Delay every response by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.latency = Some(latency);
    }

    /// Number of `fetch()` calls so far.
    pub fn fetch_count(&self) -> usize {
        self.inner.lock().unwrap().fetch_count
    }

    /// Session keys seen by `fetch()`, in call order.
    pub fn session_keys(&self) -> Vec<String> {
        self.inner.lock().unwrap().session_keys.clone()
    }

    /// Clear all state.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockListingInner::default();
    }
}

#[async_trait]
impl ListingClient for MockListingClient {
    async fn fetch(&self, session: &Session) -> Result<FileListing, SyncError> {
        let (response, latency) = {
            let mut inner = self.inner.lock().unwrap();
            inner.fetch_count += 1;
            inner.session_keys.push(session.key.clone());
            let response = match inner.responses.pop_front() {
                Some(response) => response,
                None => inner
                    .fallback
                    .clone()
                    .ok_or_else(|| SyncError::Network("no response queued".into())),
            };
            (response, inner.latency)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        response
    }
}

/// Mock certificate endpoint returning a fixed result.
#[derive(Debug, Clone)]
pub struct MockCertificateService {
    inner: Arc<Mutex<MockCertificateInner>>,
}

#[derive(Debug)]
struct MockCertificateInner {
    result: Result<Certificate, SyncError>,
    fetch_count: usize,
    tokens: Vec<String>,
}

impl MockCertificateService {
    /// Always answer with `certificate`.
    pub fn new(certificate: Certificate) -> Self {
        Self::with_result(Ok(certificate))
    }

    /// Always fail with `error`.
    pub fn failing(error: SyncError) -> Self {
        Self::with_result(Err(error))
    }

    fn with_result(result: Result<Certificate, SyncError>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockCertificateInner {
                result,
                fetch_count: 0,
                tokens: Vec::new(),
            })),
        }
    }

    /// Number of certificate fetches so far.
    pub fn fetch_count(&self) -> usize {
        self.inner.lock().unwrap().fetch_count
    }

    /// Tokens presented with each fetch.
    pub fn tokens(&self) -> Vec<String> {
        self.inner.lock().unwrap().tokens.clone()
    }
}

#[async_trait]
impl CertificateService for MockCertificateService {
    async fn fetch_and_parse(
        &self,
        token: &str,
        _contract_id: &str,
    ) -> Result<Certificate, SyncError> {
        let mut inner = self.inner.lock().unwrap();
        inner.fetch_count += 1;
        inner.tokens.push(token.to_string());
        inner.result.clone()
    }
}

/// Token minter returning a fixed token (or none).
#[derive(Debug, Clone, Default)]
pub struct StaticTokenMinter {
    token: Option<String>,
}

impl StaticTokenMinter {
    /// Always mint `token`.
    pub fn new(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
        }
    }

    /// Never able to mint.
    pub fn failing() -> Self {
        Self { token: None }
    }
}

impl TokenMinter for StaticTokenMinter {
    fn basic_token(&self, _app_id: &str, _contract_id: &str) -> Option<String> {
        self.token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use session_sync_types::SyncState;

    #[tokio::test]
    async fn listing_returns_queued_in_order_then_fallback() {
        let client = MockListingClient::new();
        client.queue(Ok(FileListing::empty(SyncState::Pending)));
        client.queue(Err(SyncError::Network("boom".into())));
        client.set_fallback(FileListing::empty(SyncState::Completed));
        let session = Session::new("key");

        let first = client.fetch(&session).await.unwrap();
        assert_eq!(first.state(), SyncState::Pending);
        assert!(client.fetch(&session).await.is_err());
        let third = client.fetch(&session).await.unwrap();
        assert_eq!(third.state(), SyncState::Completed);
        let fourth = client.fetch(&session).await.unwrap();
        assert_eq!(fourth.state(), SyncState::Completed);

        assert_eq!(client.fetch_count(), 4);
        assert_eq!(client.session_keys(), vec!["key"; 4]);
    }

    #[tokio::test]
    async fn listing_without_responses_fails() {
        let client = MockListingClient::new();
        let result = client.fetch(&Session::new("key")).await;
        assert!(matches!(result, Err(SyncError::Network(_))));
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let client1 = MockListingClient::new();
        let client2 = client1.clone();
        client1.set_fallback(FileListing::empty(SyncState::Running));

        client2.fetch(&Session::new("key")).await.unwrap();
        assert_eq!(client1.fetch_count(), 1);

        client1.reset();
        assert_eq!(client2.fetch_count(), 0);
    }

    #[tokio::test]
    async fn certificate_service_counts_fetches() {
        let cert = Certificate {
            contract_id: "c".into(),
            time_ranges: vec![],
        };
        let service = MockCertificateService::new(cert.clone());
        assert_eq!(service.fetch_and_parse("t", "c").await.unwrap(), cert);
        assert_eq!(service.fetch_count(), 1);
        assert_eq!(service.tokens(), vec!["t"]);
    }

    #[test]
    fn token_minter_variants() {
        assert_eq!(
            StaticTokenMinter::new("jwt").basic_token("a", "c"),
            Some("jwt".to_string())
        );
        assert_eq!(StaticTokenMinter::failing().basic_token("a", "c"), None);
    }
}
