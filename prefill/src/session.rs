//! Turning a synthetic email into an authenticated platform session.

use crate::api::{AssertionService, PlatformApi};
use prefill_common::{Result, SyntheticIdentity};
use std::sync::Arc;
use tracing::debug;

/// Chains the assertion generator and the platform login.
#[derive(Clone)]
pub struct SessionIssuer {
    assertions: Arc<dyn AssertionService>,
    platform: Arc<dyn PlatformApi>,
    audience: String,
}

impl SessionIssuer {
    pub fn new(
        assertions: Arc<dyn AssertionService>,
        platform: Arc<dyn PlatformApi>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            assertions,
            platform,
            audience: audience.into(),
        }
    }

    /// Obtain an assertion for `email` and redeem it for a session.
    ///
    /// Neither call is retried.
    pub async fn issue_session(&self, email: &str) -> Result<SyntheticIdentity> {
        let assertion = self.assertions.issue_assertion(email).await?;
        let session = self.platform.login(&assertion, &self.audience).await?;
        debug!(email, id = %session.public.id, "session issued");
        Ok(SyntheticIdentity::new(
            email,
            assertion,
            session.token,
            session.public,
        ))
    }
}
