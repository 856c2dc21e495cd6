//! Common types used across prefill components.

use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

/// Build the synthetic email for the identity at `index`.
///
/// Emails are derived from the index alone, so they are unique within a run.
pub fn synthetic_email(index: usize) -> String {
    format!("test{index}@test.com")
}

/// Public half of a platform session, as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicProfile {
    /// Platform user id. The platform sends either a number or a string.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub username: String,
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Number(u64),
        Text(String),
    }

    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Number(n) => n.to_string(),
        IdRepr::Text(s) => s,
    })
}

/// A fake user with an authenticated platform session.
///
/// Immutable once created and owned by the run that created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntheticIdentity {
    pub email: String,
    pub assertion: String,
    /// Session token passed as `_user` on authenticated calls.
    pub token: String,
    pub id: String,
    pub username: String,
}

impl SyntheticIdentity {
    pub fn new(
        email: impl Into<String>,
        assertion: impl Into<String>,
        token: impl Into<String>,
        profile: PublicProfile,
    ) -> Self {
        Self {
            email: email.into(),
            assertion: assertion.into(),
            token: token.into(),
            id: profile.id,
            username: profile.username,
        }
    }
}

/// A friend request that the platform accepted for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendRequest {
    pub requester: Arc<SyntheticIdentity>,
    pub recipient: Arc<SyntheticIdentity>,
}

/// Outcome of a friend request between two identities.
///
/// There is no half-populated state: either both sides are known, or the
/// request collapsed into a no-op because the relation already existed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FriendEdge {
    Linked(FriendRequest),
    Empty,
}

impl FriendEdge {
    pub fn linked(requester: Arc<SyntheticIdentity>, recipient: Arc<SyntheticIdentity>) -> Self {
        Self::Linked(FriendRequest {
            requester,
            recipient,
        })
    }
}

/// Default submission parameters merged into every catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDefaults {
    #[serde(default = "default_icons")]
    pub icons: String,
    #[serde(default = "default_screenshots")]
    pub screenshots: String,
}

impl Default for SubmissionDefaults {
    fn default() -> Self {
        Self {
            icons: default_icons(),
            screenshots: default_screenshots(),
        }
    }
}

fn default_icons() -> String {
    "128".to_string()
}

fn default_screenshots() -> String {
    "yes".to_string()
}

/// A game definition from the fixed catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub app_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icons: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshots: Option<String>,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, app_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            app_url: app_url.into(),
            icons: None,
            screenshots: None,
        }
    }

    pub fn with_icons(mut self, icons: impl Into<String>) -> Self {
        self.icons = Some(icons.into());
        self
    }

    pub fn with_screenshots(mut self, screenshots: impl Into<String>) -> Self {
        self.screenshots = Some(screenshots.into());
        self
    }

    /// Fill unset fields from `defaults`. Fields set on the entry always win.
    pub fn merge_defaults(&self, defaults: &SubmissionDefaults) -> GameSubmission {
        GameSubmission {
            name: self.name.clone(),
            app_url: self.app_url.clone(),
            icons: self.icons.clone().unwrap_or_else(|| defaults.icons.clone()),
            screenshots: self
                .screenshots
                .clone()
                .unwrap_or_else(|| defaults.screenshots.clone()),
        }
    }

    /// The three games every run submits unless configured otherwise.
    pub fn default_catalog() -> Vec<CatalogEntry> {
        vec![
            CatalogEntry::new("Mario Broskis", "http://mario.broskis"),
            CatalogEntry::new("Halo 718", "http://halo.com"),
            CatalogEntry::new("Left 5 Dead", "http://dead.left"),
        ]
    }
}

/// Form body of a game submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSubmission {
    pub name: String,
    pub app_url: String,
    pub icons: String,
    pub screenshots: String,
}

/// A game the platform accepted, identified downstream only by its slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub slug: String,
    pub name: String,
    pub app_url: String,
    pub icons: String,
    pub screenshots: String,
}

impl GameRecord {
    pub fn from_submission(submission: GameSubmission, slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: submission.name,
            app_url: submission.app_url,
            icons: submission.icons,
            screenshots: submission.screenshots,
        }
    }
}

/// Totals reported when a run reaches `Done`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub users: usize,
    pub games: usize,
    pub game_slugs: Vec<String>,
    /// Friend requests that were sent and accepted.
    pub friendships: usize,
    /// Friend requests absorbed as benign conflicts.
    pub friend_conflicts: usize,
    pub purchases: usize,
    /// Seed that drove peer and game sampling.
    pub seed: u64,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "created {} users and {} games; {} friendships ({} skipped), {} purchases (seed {})",
            self.users,
            self.games,
            self.friendships,
            self.friend_conflicts,
            self.purchases,
            self.seed
        )
    }
}
