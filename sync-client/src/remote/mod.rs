//! Remote collaborators of the files reader.
//!
//! This module abstracts the endpoints the orchestrator talks to. The HTTP
//! client, request signing and certificate parsing live behind these traits.
//!
//! # Design
//!
//! - `ListingClient::fetch()` issues a single listing request (no retries)
//! - `CertificateService::fetch_and_parse()` fetches a contract certificate
//! - `TokenMinter::basic_token()` mints the authorization for that fetch
//!
//! # Example
//!
//! ```ignore
//! let client = MockListingClient::new();
//! client.queue(Ok(FileListing::empty(SyncState::Running)));
//! let listing = client.fetch(&Session::new("key")).await?;
//! ```

mod mock;

pub use mock::{MockCertificateService, MockListingClient, StaticTokenMinter};

use async_trait::async_trait;
use session_sync_core::Certificate;
use session_sync_types::{FileListing, Session, SyncError};

/// Fetches the file listing for a session.
#[async_trait]
pub trait ListingClient: Send + Sync {
    /// Issue one listing request for `session`.
    ///
    /// Failures are returned as-is; the orchestrator decides whether they
    /// end the run.
    async fn fetch(&self, session: &Session) -> Result<FileListing, SyncError>;
}

/// Fetches and parses contract certificates.
#[async_trait]
pub trait CertificateService: Send + Sync {
    /// Fetch the certificate for `contract_id`, authorized by `token`.
    async fn fetch_and_parse(&self, token: &str, contract_id: &str)
        -> Result<Certificate, SyncError>;
}

/// Mints authorization tokens.
pub trait TokenMinter: Send + Sync {
    /// Mint a basic request token, or `None` if signing is not possible.
    fn basic_token(&self, app_id: &str, contract_id: &str) -> Option<String>;
}
