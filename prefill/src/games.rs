//! Stage 1b: submitting the game catalog.

use crate::api::PlatformApi;
use crate::fanout::{CallGate, join_fail_fast};
use prefill_common::{CatalogEntry, GameRecord, PrefillError, Result, SubmissionDefaults};
use std::sync::Arc;
use tracing::{debug, info};

pub struct GameFactory {
    platform: Arc<dyn PlatformApi>,
    defaults: SubmissionDefaults,
    gate: CallGate,
}

impl GameFactory {
    pub fn new(platform: Arc<dyn PlatformApi>, defaults: SubmissionDefaults, gate: CallGate) -> Self {
        Self {
            platform,
            defaults,
            gate,
        }
    }

    /// Submit every catalog entry and collect the slugs the platform assigns.
    pub async fn create_games(&self, catalog: &[CatalogEntry]) -> Result<Vec<GameRecord>> {
        info!(count = catalog.len(), "submitting games");

        let branches = catalog.iter().map(|entry| {
            let submission = entry.merge_defaults(&self.defaults);
            let platform = self.platform.clone();
            let gate = self.gate.clone();
            async move {
                let slug = gate.call(platform.submit_game(&submission)).await?;
                debug!(name = %submission.name, slug = %slug, "game submitted");
                Ok::<_, PrefillError>(GameRecord::from_submission(submission, slug))
            }
        });

        let games = join_fail_fast("games", self.gate.abort_signal(), branches).await?;
        info!(count = games.len(), "games created");
        Ok(games)
    }

    /// Look up each slug on the platform's game-detail route.
    pub async fn verify_games(&self, slugs: &[String]) -> Result<Vec<serde_json::Value>> {
        let branches = slugs.iter().cloned().map(|slug| {
            let platform = self.platform.clone();
            let gate = self.gate.clone();
            async move { gate.call(platform.game_detail(&slug)).await }
        });
        join_fail_fast("verify", self.gate.abort_signal(), branches).await
    }
}
