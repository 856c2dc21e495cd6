//! Contracts of the remote services a run talks to.
//!
//! The orchestrator only sees these traits. [`http`] implements them over
//! form-encoded HTTP; tests swap in in-memory fakes.

pub mod http;

use async_trait::async_trait;
use prefill_common::{GameSubmission, PublicProfile, Result};
use serde::Deserialize;

pub use http::{HttpAssertionClient, HttpPlatformClient, build_http_client};

/// Successful login: a session token plus the public profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginSession {
    pub token: String,
    pub public: PublicProfile,
}

/// Issues identity assertions for synthetic emails.
#[async_trait]
pub trait AssertionService: Send + Sync {
    async fn issue_assertion(&self, email: &str) -> Result<String>;
}

/// The platform API endpoints used while prefilling.
///
/// Calls that can carry an application error surface it as
/// [`prefill_common::PrefillError::Application`]; transport failures as
/// [`prefill_common::PrefillError::Connection`].
#[async_trait]
pub trait PlatformApi: Send + Sync {
    async fn login(&self, assertion: &str, audience: &str) -> Result<LoginSession>;

    /// Send a friend request from the holder of `requester_token`.
    async fn send_friend_request(&self, requester_token: &str, recipient_id: &str) -> Result<()>;

    /// Accept a pending request on behalf of the holder of `acceptor_token`.
    async fn accept_friend_request(&self, acceptor_token: &str, acceptee_id: &str) -> Result<()>;

    /// Submit a game and return the slug the platform assigned.
    async fn submit_game(&self, submission: &GameSubmission) -> Result<String>;

    /// Record a purchase. The response body is returned unparsed.
    async fn purchase(&self, token: &str, game_slug: &str) -> Result<String>;

    async fn game_detail(&self, slug: &str) -> Result<serde_json::Value>;
}

/// Clears the platform's backing store.
#[async_trait]
pub trait StoreFlusher: Send + Sync {
    async fn flush(&self) -> Result<()>;
}
