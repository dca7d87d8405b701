//! SRUN portal login flow
//!
//! The backend trait separates protocol orchestration from transport, so
//! the state machine's response interpretation and retry behavior can be
//! exercised against scripted responses without a live portal.

pub mod srun;

pub use srun::{HttpBackend, SrunPortal};

use crate::error::PortalError;
use crate::models::{ChallengeToken, LoginRequest, LoginResponse, PortalParams};
use async_trait::async_trait;

/// Transport operations the login state machine depends on.
#[async_trait]
pub trait PortalBackend: Send + Sync {
    /// Fetch the portal root page and scrape `user_ip` / `ac_id` from it.
    async fn discover(&self) -> Result<PortalParams, PortalError>;

    /// Fetch a fresh challenge for the account. Tokens are server-side
    /// time-limited; one token backs at most one submission.
    async fn fetch_challenge(&self, username: &str) -> Result<ChallengeToken, PortalError>;

    /// Submit the assembled login request.
    async fn submit(&self, request: &LoginRequest) -> Result<LoginResponse, PortalError>;

    /// Reachability probe used to disambiguate `challenge_expire_error`
    /// and `sign_error` responses, and by the daemon to decide when a
    /// login is needed.
    async fn probe(&self) -> bool;
}
