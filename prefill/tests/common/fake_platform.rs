//! In-process stand-in for the platform API and the assertion generator.
//!
//! Both services are mounted on one axum router bound to an ephemeral
//! port. Friend requests are tracked the way the real platform does it,
//! so repeated and reciprocal requests come back as `already_requested` or
//! `already_friends`.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct Account {
    pub id: u64,
    pub email: String,
}

#[derive(Debug, Default)]
pub struct PlatformState {
    pub assertions_issued: Vec<String>,
    pub accounts: HashMap<String, Account>,
    pub rejected_logins: HashSet<String>,
    pub login_audiences: Vec<String>,
    pub friend_requests: Vec<(u64, u64)>,
    pub pending: HashSet<(u64, u64)>,
    pub friends: HashSet<(u64, u64)>,
    pub accepts: usize,
    pub games: HashMap<String, Value>,
    pub purchases: Vec<(u64, String)>,
    next_id: u64,
}

impl PlatformState {
    fn account_by_token(&self, token: &str) -> Option<Account> {
        self.accounts.get(token).cloned()
    }

    pub fn logged_in_emails(&self) -> HashSet<String> {
        self.accounts.values().map(|a| a.email.clone()).collect()
    }

    fn friends_key(a: u64, b: u64) -> (u64, u64) {
        (a.min(b), a.max(b))
    }
}

type Shared = Arc<Mutex<PlatformState>>;

pub struct FakePlatformServer {
    pub addr: SocketAddr,
    pub state: Shared,
    task: tokio::task::JoinHandle<()>,
}

impl FakePlatformServer {
    pub async fn start() -> Self {
        let state: Shared = Arc::default();
        let router = Router::new()
            .route("/generate", post(generate))
            .route("/user/login", post(login))
            .route("/user/friends/request", post(friend_request))
            .route("/user/friends/accept", post(friend_accept))
            .route("/game/submit", post(submit_game))
            .route("/user/purchase", post(purchase))
            .route("/game/{slug}/detail", get(game_detail))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, state, task }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn reject_login(&self, email: &str) {
        self.state
            .lock()
            .unwrap()
            .rejected_logins
            .insert(email.to_string());
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&PlatformState) -> R) -> R {
        f(&self.state.lock().unwrap())
    }
}

impl Drop for FakePlatformServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Deserialize)]
struct GenerateForm {
    email: String,
}

async fn generate(State(state): State<Shared>, Form(form): Form<GenerateForm>) -> Json<Value> {
    state
        .lock()
        .unwrap()
        .assertions_issued
        .push(form.email.clone());
    Json(json!({ "assertion": format!("ssa.{}", form.email) }))
}

#[derive(Deserialize)]
struct LoginForm {
    assertion: String,
    audience: String,
}

async fn login(State(state): State<Shared>, Form(form): Form<LoginForm>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    let Some(email) = form.assertion.strip_prefix("ssa.").map(str::to_string) else {
        return Json(json!({ "error": "bad_assertion" }));
    };
    if state.rejected_logins.contains(&email) {
        return Json(json!({ "error": "verification_failed" }));
    }

    state.login_audiences.push(form.audience);
    state.next_id += 1;
    let id = state.next_id;
    let token = format!("tok.{id}");
    state.accounts.insert(
        token.clone(),
        Account {
            id,
            email: email.clone(),
        },
    );
    let username = email.split('@').next().unwrap_or_default().to_string();
    Json(json!({
        "token": token,
        "public": { "id": id, "username": username },
    }))
}

#[derive(Deserialize)]
struct FriendRequestForm {
    #[serde(rename = "_user")]
    user: String,
    recipient: u64,
}

async fn friend_request(
    State(state): State<Shared>,
    Form(form): Form<FriendRequestForm>,
) -> Json<Value> {
    let mut state = state.lock().unwrap();
    let Some(requester) = state.account_by_token(&form.user) else {
        return Json(json!({ "error": "bad_user" }));
    };
    let (from, to) = (requester.id, form.recipient);
    state.friend_requests.push((from, to));

    if state.friends.contains(&PlatformState::friends_key(from, to)) {
        return Json(json!({ "error": "already_friends" }));
    }
    if state.pending.contains(&(from, to)) || state.pending.contains(&(to, from)) {
        return Json(json!({ "error": "already_requested" }));
    }
    state.pending.insert((from, to));
    Json(json!({ "success": true }))
}

#[derive(Deserialize)]
struct FriendAcceptForm {
    #[serde(rename = "_user")]
    user: String,
    acceptee: u64,
}

async fn friend_accept(
    State(state): State<Shared>,
    Form(form): Form<FriendAcceptForm>,
) -> Json<Value> {
    let mut state = state.lock().unwrap();
    let Some(acceptor) = state.account_by_token(&form.user) else {
        return Json(json!({ "error": "bad_user" }));
    };
    if !state.pending.remove(&(form.acceptee, acceptor.id)) {
        return Json(json!({ "error": "no_such_request" }));
    }
    state
        .friends
        .insert(PlatformState::friends_key(form.acceptee, acceptor.id));
    state.accepts += 1;
    Json(json!({ "success": true }))
}

#[derive(Deserialize)]
struct SubmitForm {
    name: String,
    app_url: String,
    icons: String,
    screenshots: String,
}

async fn submit_game(State(state): State<Shared>, Form(form): Form<SubmitForm>) -> Json<Value> {
    let slug = slugify(&form.name);
    let game = json!({
        "slug": slug,
        "name": form.name,
        "app_url": form.app_url,
        "icons": form.icons,
        "screenshots": form.screenshots,
    });
    state.lock().unwrap().games.insert(slug.clone(), game);
    Json(json!({ "success": true, "slug": slug }))
}

#[derive(Deserialize)]
struct PurchaseForm {
    #[serde(rename = "_user")]
    user: String,
    game: String,
}

async fn purchase(State(state): State<Shared>, Form(form): Form<PurchaseForm>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    let Some(buyer) = state.account_by_token(&form.user) else {
        return Json(json!({ "error": "bad_user" }));
    };
    if !state.games.contains_key(&form.game) {
        return Json(json!({ "error": "bad_game" }));
    }
    state.purchases.push((buyer.id, form.game));
    Json(json!({ "success": true }))
}

async fn game_detail(State(state): State<Shared>, Path(slug): Path<String>) -> Json<Value> {
    match state.lock().unwrap().games.get(&slug) {
        Some(game) => Json(game.clone()),
        None => Json(json!({ "error": "bad_game" })),
    }
}
