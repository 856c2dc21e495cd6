//! Stage 2a: building the friend graph.
//!
//! Every user sends a request to a handful of sampled peers, and each
//! request that went through is accepted by its recipient. A request that
//! collides with an existing or pending relation is not an error: it
//! resolves to [`FriendEdge::Empty`] and no accept is issued for it.

use crate::api::PlatformApi;
use crate::fanout::{CallGate, join_fail_fast};
use crate::sampling::Sampler;
use prefill_common::{FriendEdge, FriendRequest, PrefillError, Result, SyntheticIdentity};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Peers one user will send requests to.
#[derive(Debug, Clone)]
pub struct PeerSelection {
    pub requester: Arc<SyntheticIdentity>,
    pub recipients: Vec<Arc<SyntheticIdentity>>,
}

/// Sample `min(peers_per_user, users.len())` distinct peers for every user.
///
/// A user may be sampled as its own peer.
pub fn plan_peers(
    users: &[Arc<SyntheticIdentity>],
    peers_per_user: usize,
    sampler: &mut Sampler,
) -> Vec<PeerSelection> {
    users
        .iter()
        .map(|requester| PeerSelection {
            requester: requester.clone(),
            recipients: sampler
                .pick(users, peers_per_user)
                .into_iter()
                .cloned()
                .collect(),
        })
        .collect()
}

/// Accepted friendships and the requests skipped as benign conflicts.
#[derive(Debug, Clone, Default)]
pub struct FriendGraph {
    pub friendships: Vec<FriendRequest>,
    pub conflicts: usize,
}

pub struct FriendGraphBuilder {
    platform: Arc<dyn PlatformApi>,
    gate: CallGate,
}

impl FriendGraphBuilder {
    pub fn new(platform: Arc<dyn PlatformApi>, gate: CallGate) -> Self {
        Self { platform, gate }
    }

    /// Send and accept every planned request.
    ///
    /// Users run concurrently, and so do the edges of one user. Each edge is
    /// accepted only after its own request resolved.
    pub async fn build(&self, plan: Vec<PeerSelection>) -> Result<FriendGraph> {
        let planned: usize = plan.iter().map(|p| p.recipients.len()).sum();
        info!(users = plan.len(), requests = planned, "building friend graph");

        let branches = plan.into_iter().map(|selection| {
            let platform = self.platform.clone();
            let gate = self.gate.clone();
            async move { befriend_peers(platform, gate, selection).await }
        });

        let per_user = join_fail_fast("friends", self.gate.abort_signal(), branches).await?;

        let mut graph = FriendGraph::default();
        for outcome in per_user.into_iter().flatten() {
            match outcome {
                Some(request) => graph.friendships.push(request),
                None => graph.conflicts += 1,
            }
        }

        info!(
            friendships = graph.friendships.len(),
            conflicts = graph.conflicts,
            "friend graph built"
        );
        Ok(graph)
    }
}

async fn befriend_peers(
    platform: Arc<dyn PlatformApi>,
    gate: CallGate,
    selection: PeerSelection,
) -> Result<Vec<Option<FriendRequest>>> {
    let abort = gate.abort_signal().clone();
    let requester = selection.requester;

    let edges = selection.recipients.into_iter().map(|recipient| {
        let platform = platform.clone();
        let gate = gate.clone();
        let requester = requester.clone();
        async move {
            let edge = send_request(platform.as_ref(), &gate, requester, recipient).await?;
            accept_request(platform.as_ref(), &gate, edge).await
        }
    });

    join_fail_fast("friend-edges", &abort, edges).await
}

/// Ask the platform to deliver a request from `requester` to `recipient`.
pub async fn send_request(
    platform: &dyn PlatformApi,
    gate: &CallGate,
    requester: Arc<SyntheticIdentity>,
    recipient: Arc<SyntheticIdentity>,
) -> Result<FriendEdge> {
    let sent = gate
        .call(platform.send_friend_request(&requester.token, &recipient.id))
        .await;

    match sent {
        Ok(()) => {
            debug!(from = %requester.email, to = %recipient.email, "friend request sent");
            Ok(FriendEdge::linked(requester, recipient))
        }
        Err(err) if err.is_benign_friend_conflict() => {
            warn!(
                from = %requester.email,
                to = %recipient.email,
                code = err.code().unwrap_or_default(),
                "friend request skipped"
            );
            Ok(FriendEdge::Empty)
        }
        Err(err) => Err(err),
    }
}

/// Accept `edge` as its recipient. An empty edge makes no call.
pub async fn accept_request(
    platform: &dyn PlatformApi,
    gate: &CallGate,
    edge: FriendEdge,
) -> Result<Option<FriendRequest>> {
    let FriendEdge::Linked(request) = edge else {
        return Ok(None);
    };

    gate.call(
        platform.accept_friend_request(&request.recipient.token, &request.requester.id),
    )
    .await
    .inspect_err(|err: &PrefillError| {
        debug!(
            from = %request.requester.email,
            to = %request.recipient.email,
            error = %err,
            "friend accept failed"
        );
    })?;

    Ok(Some(request))
}
