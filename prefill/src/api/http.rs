//! reqwest-backed clients for the assertion generator and the platform API.
//!
//! Requests are form-encoded and responses are JSON. HTTP status codes are
//! not consulted: the platform reports failures through an `error` field in
//! the body, and that field alone decides between success and
//! [`PrefillError::Application`].

use super::{AssertionService, LoginSession, PlatformApi};
use async_trait::async_trait;
use prefill_common::{GameSubmission, PrefillError, RemoteCall, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

const USER_AGENT: &str = concat!("galaxy-prefill/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by every remote call in a run.
///
/// No request timeout is set; a hung endpoint stalls its stage.
pub fn build_http_client() -> reqwest::Result<Client> {
    Client::builder().user_agent(USER_AGENT).build()
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

async fn post_form<F>(client: &Client, call: RemoteCall, url: &str, form: &F) -> Result<String>
where
    F: Serialize + ?Sized + Sync,
{
    debug!(%call, url, "POST");
    let response = client
        .post(url)
        .form(form)
        .send()
        .await
        .map_err(|e| PrefillError::connection(call, e.to_string()))?;

    response
        .text()
        .await
        .map_err(|e| PrefillError::connection(call, e.to_string()))
}

fn parse_json(call: RemoteCall, body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| PrefillError::malformed(call, e.to_string()))
}

/// Turn an `error` field into an application error.
fn check_error_field(call: RemoteCall, body: &Value) -> Result<()> {
    match body.get("error") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(code)) => Err(PrefillError::application(call, code.clone())),
        Some(other) => Err(PrefillError::application(call, other.to_string())),
    }
}

fn required_str(call: RemoteCall, body: &Value, field: &str) -> Result<String> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| PrefillError::malformed(call, format!("missing string field '{field}'")))
}

/// Client for the assertion generator's `/generate` endpoint.
#[derive(Clone)]
pub struct HttpAssertionClient {
    client: Client,
    base_url: String,
}

impl HttpAssertionClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AssertionService for HttpAssertionClient {
    async fn issue_assertion(&self, email: &str) -> Result<String> {
        let call = RemoteCall::IssueAssertion;
        let url = join_url(&self.base_url, "/generate");
        let body = post_form(&self.client, call, &url, &[("email", email)]).await?;
        let json = parse_json(call, &body)?;
        required_str(call, &json, "assertion")
    }
}

/// Client for the platform API.
#[derive(Clone)]
pub struct HttpPlatformClient {
    client: Client,
    base_url: String,
}

impl HttpPlatformClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    async fn post_checked<F>(&self, call: RemoteCall, path: &str, form: &F) -> Result<Value>
    where
        F: Serialize + ?Sized + Sync,
    {
        let body = post_form(&self.client, call, &self.url(path), form).await?;
        let json = parse_json(call, &body)?;
        check_error_field(call, &json)?;
        Ok(json)
    }
}

#[async_trait]
impl PlatformApi for HttpPlatformClient {
    async fn login(&self, assertion: &str, audience: &str) -> Result<LoginSession> {
        let call = RemoteCall::Login;
        let json = self
            .post_checked(
                call,
                "/user/login",
                &[("assertion", assertion), ("audience", audience)],
            )
            .await?;
        serde_json::from_value(json).map_err(|e| PrefillError::malformed(call, e.to_string()))
    }

    async fn send_friend_request(&self, requester_token: &str, recipient_id: &str) -> Result<()> {
        self.post_checked(
            RemoteCall::FriendRequest,
            "/user/friends/request",
            &[("_user", requester_token), ("recipient", recipient_id)],
        )
        .await
        .map(|_| ())
    }

    async fn accept_friend_request(&self, acceptor_token: &str, acceptee_id: &str) -> Result<()> {
        self.post_checked(
            RemoteCall::FriendAccept,
            "/user/friends/accept",
            &[("_user", acceptor_token), ("acceptee", acceptee_id)],
        )
        .await
        .map(|_| ())
    }

    async fn submit_game(&self, submission: &GameSubmission) -> Result<String> {
        let call = RemoteCall::SubmitGame;
        let json = self.post_checked(call, "/game/submit", submission).await?;
        required_str(call, &json, "slug")
    }

    async fn purchase(&self, token: &str, game_slug: &str) -> Result<String> {
        post_form(
            &self.client,
            RemoteCall::Purchase,
            &self.url("/user/purchase"),
            &[("_user", token), ("game", game_slug)],
        )
        .await
    }

    async fn game_detail(&self, slug: &str) -> Result<Value> {
        let call = RemoteCall::GameDetail;
        let url = self.url(&format!("/game/{slug}/detail"));
        debug!(%call, url, "GET");
        let body = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PrefillError::connection(call, e.to_string()))?
            .text()
            .await
            .map_err(|e| PrefillError::connection(call, e.to_string()))?;
        let json = parse_json(call, &body)?;
        check_error_field(call, &json)?;
        Ok(json)
    }
}
