//! Stage 2b: random purchases.

use crate::api::PlatformApi;
use crate::fanout::{CallGate, join_fail_fast};
use crate::sampling::Sampler;
use prefill_common::{PrefillError, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// One purchase to make: a session buying a game it has not bought yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    pub token: String,
    pub slug: String,
}

/// For each token, pick up to `per_session` distinct slugs.
pub fn plan_purchases(
    tokens: &[String],
    slugs: &[String],
    per_session: usize,
    sampler: &mut Sampler,
) -> Vec<PurchaseOrder> {
    tokens
        .iter()
        .flat_map(|token| {
            sampler
                .pick(slugs, per_session)
                .into_iter()
                .map(move |slug| PurchaseOrder {
                    token: token.clone(),
                    slug: slug.clone(),
                })
        })
        .collect()
}

pub struct PurchaseGenerator {
    platform: Arc<dyn PlatformApi>,
    gate: CallGate,
}

impl PurchaseGenerator {
    pub fn new(platform: Arc<dyn PlatformApi>, gate: CallGate) -> Self {
        Self { platform, gate }
    }

    /// Issue every order concurrently. Any failure fails the whole stage.
    ///
    /// Returns the number of purchases made. Response bodies are not read.
    pub async fn generate(&self, orders: Vec<PurchaseOrder>) -> Result<usize> {
        info!(count = orders.len(), "generating purchases");

        let branches = orders.into_iter().map(|order| {
            let platform = self.platform.clone();
            let gate = self.gate.clone();
            async move {
                let body = gate.call(platform.purchase(&order.token, &order.slug)).await?;
                debug!(slug = %order.slug, bytes = body.len(), "purchase made");
                Ok::<_, PrefillError>(())
            }
        });

        let made = join_fail_fast("purchases", self.gate.abort_signal(), branches)
            .await?
            .len();
        info!(count = made, "purchases generated");
        Ok(made)
    }
}
