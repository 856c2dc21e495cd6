//! Stage 1a: creating synthetic users.

use crate::fanout::{CallGate, join_fail_fast};
use crate::session::SessionIssuer;
use prefill_common::{Result, SyntheticIdentity, synthetic_email};
use tracing::info;

/// Creates `n` users at once, one session per indexed email.
pub struct UserFactory {
    issuer: SessionIssuer,
    gate: CallGate,
}

impl UserFactory {
    pub fn new(issuer: SessionIssuer, gate: CallGate) -> Self {
        Self { issuer, gate }
    }

    /// Issue a session for `test0@test.com` .. `test{n-1}@test.com`.
    ///
    /// Fails with the first error any identity hits. Sessions already
    /// created remotely are left in place.
    pub async fn create_users(&self, n: usize) -> Result<Vec<SyntheticIdentity>> {
        info!(count = n, "creating users");

        let branches = (0..n).map(|index| {
            let issuer = self.issuer.clone();
            let gate = self.gate.clone();
            async move {
                let email = synthetic_email(index);
                gate.call(issuer.issue_session(&email)).await
            }
        });

        let users = join_fail_fast("users", self.gate.abort_signal(), branches).await?;
        info!(count = users.len(), "users created");
        Ok(users)
    }
}
