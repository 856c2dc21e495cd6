//! Top-level run sequencing.
//!
//! A run moves through `Init → [Flush] → Stage1 → Stage2 → Done`. Stage 1
//! creates users and games side by side; Stage 2 needs both of their
//! results and builds friendships and purchases side by side. The first
//! fatal error in any stage ends the run in `Aborted`.
//!
//! Nothing is rolled back on abort, and by default calls already in flight
//! are left to finish on their own. The abort signal handed to every gate
//! fires on the first failure; with `cancel_on_abort` set the gates stop
//! issuing and awaiting calls once it has.

use crate::api::{
    AssertionService, HttpAssertionClient, HttpPlatformClient, PlatformApi, StoreFlusher,
    build_http_client,
};
use crate::fanout::CallGate;
use crate::flush::RedisFlusher;
use crate::friends::{FriendGraphBuilder, plan_peers};
use crate::games::GameFactory;
use crate::purchases::{PurchaseGenerator, plan_purchases};
use crate::sampling::Sampler;
use crate::session::SessionIssuer;
use crate::users::UserFactory;
use prefill_common::{PrefillConfig, PrefillError, Result, RunSummary};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Where a run is in its sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Init,
    Flush,
    Stage1,
    Stage2,
    Done,
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Flush => "flush",
            Self::Stage1 => "stage1",
            Self::Stage2 => "stage2",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// A run that ended in `Aborted`, with the stage it failed in.
#[derive(Debug, thiserror::Error)]
#[error("prefill aborted in {stage}: {source}")]
pub struct AbortError {
    pub stage: RunState,
    #[source]
    pub source: PrefillError,
}

/// Remote collaborators of a run.
#[derive(Clone)]
pub struct Services {
    pub assertions: Arc<dyn AssertionService>,
    pub platform: Arc<dyn PlatformApi>,
    pub store: Option<Arc<dyn StoreFlusher>>,
}

impl Services {
    /// HTTP clients for both endpoints and a flusher for `store_addr`.
    pub fn from_config(config: &PrefillConfig) -> reqwest::Result<Self> {
        let client = build_http_client()?;
        Ok(Self {
            assertions: Arc::new(HttpAssertionClient::new(
                client.clone(),
                &config.assertion_endpoint,
            )),
            platform: Arc::new(HttpPlatformClient::new(client, &config.api_endpoint)),
            store: Some(Arc::new(RedisFlusher::new(&config.store_addr))),
        })
    }
}

pub struct Orchestrator {
    config: PrefillConfig,
    services: Services,
    state: watch::Sender<RunState>,
}

impl Orchestrator {
    pub fn new(config: PrefillConfig, services: Services) -> Self {
        let (state, _) = watch::channel(RunState::Init);
        Self {
            config,
            services,
            state,
        }
    }

    pub fn from_config(config: PrefillConfig) -> reqwest::Result<Self> {
        let services = Services::from_config(&config)?;
        Ok(Self::new(config, services))
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Watch state transitions as they happen.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    fn enter(&self, state: RunState) {
        self.state.send_replace(state);
        info!(%state, "run state");
    }

    fn fail(&self, stage: RunState, source: PrefillError) -> AbortError {
        error!(%stage, kind = ?source.kind(), error = %source, "run aborted");
        self.state.send_replace(RunState::Aborted);
        AbortError { stage, source }
    }

    fn gate(&self, stage: &'static str, abort: &CancellationToken) -> CallGate {
        CallGate::new(
            stage,
            self.config.max_concurrency,
            abort.clone(),
            self.config.cancel_on_abort,
        )
    }

    /// Drive a full run to `Done` or `Aborted`.
    pub async fn run(&self) -> std::result::Result<RunSummary, AbortError> {
        let abort = CancellationToken::new();
        let mut sampler = Sampler::new(self.config.seed);
        info!(
            seed = sampler.seed(),
            users = self.config.user_count,
            games = self.config.catalog.len(),
            api = %self.config.api_endpoint,
            "starting prefill run"
        );

        if self.config.flush_on_start {
            self.enter(RunState::Flush);
            self.flush_store()
                .await
                .map_err(|e| self.fail(RunState::Flush, e))?;
        }

        self.enter(RunState::Stage1);
        let stage1 = self.gate("stage1", &abort);
        let users = UserFactory::new(
            SessionIssuer::new(
                self.services.assertions.clone(),
                self.services.platform.clone(),
                self.config.audience(),
            ),
            stage1.clone(),
        );
        let games = GameFactory::new(
            self.services.platform.clone(),
            self.config.submission_defaults.clone(),
            stage1,
        );

        let (users, games) = tokio::try_join!(
            users.create_users(self.config.user_count),
            games.create_games(&self.config.catalog),
        )
        .map_err(|e| self.fail(RunState::Stage1, e))?;
        info!("created {} users and {} games", users.len(), games.len());

        self.enter(RunState::Stage2);
        let users: Vec<_> = users.into_iter().map(Arc::new).collect();
        let tokens: Vec<String> = users.iter().map(|u| u.token.clone()).collect();
        let slugs: Vec<String> = games.iter().map(|g| g.slug.clone()).collect();

        let peers = plan_peers(&users, self.config.friends_per_user, &mut sampler);
        let orders = plan_purchases(
            &tokens,
            &slugs,
            self.config.purchases_per_user,
            &mut sampler,
        );

        let stage2 = self.gate("stage2", &abort);
        let friends = FriendGraphBuilder::new(self.services.platform.clone(), stage2.clone());
        let purchases = PurchaseGenerator::new(self.services.platform.clone(), stage2);

        let (graph, purchased) =
            tokio::try_join!(friends.build(peers), purchases.generate(orders))
                .map_err(|e| self.fail(RunState::Stage2, e))?;
        info!("also generated purchases and friend requests");

        self.enter(RunState::Done);
        Ok(RunSummary {
            users: users.len(),
            games: games.len(),
            game_slugs: slugs,
            friendships: graph.friendships.len(),
            friend_conflicts: graph.conflicts,
            purchases: purchased,
            seed: sampler.seed(),
        })
    }

    async fn flush_store(&self) -> Result<()> {
        match &self.services.store {
            Some(store) => store.flush().await,
            None => {
                warn!("flush requested but no store is configured, skipping");
                Ok(())
            }
        }
    }

    /// Fetch the detail record of every slug, failing on the first miss.
    pub async fn verify_games(&self, slugs: &[String]) -> Result<Vec<serde_json::Value>> {
        let gate = self.gate("verify", &CancellationToken::new());
        GameFactory::new(
            self.services.platform.clone(),
            self.config.submission_defaults.clone(),
            gate,
        )
        .verify_games(slugs)
        .await
    }
}
