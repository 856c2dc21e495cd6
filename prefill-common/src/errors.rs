//! Error taxonomy for remote calls made during a prefill run.
//!
//! Every leaf call resolves to one of two failure kinds:
//!
//! | Kind          | Meaning                                              |
//! |---------------|------------------------------------------------------|
//! | `Connection`  | The endpoint could not be reached or the call broke  |
//! | `Application` | The endpoint answered with an explicit error code    |
//!
//! Only two application codes are ever tolerated, and only on friend
//! requests: `already_friends` and `already_requested`. Everything else is
//! fatal to the enclosing stage.

use serde::Serialize;

/// Application codes on a friend request that mean the relation already
/// exists or is pending.
pub const BENIGN_FRIEND_CONFLICTS: &[&str] = &["already_friends", "already_requested"];

/// Remote operations issued during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteCall {
    IssueAssertion,
    Login,
    FriendRequest,
    FriendAccept,
    SubmitGame,
    Purchase,
    GameDetail,
    StoreFlush,
}

impl std::fmt::Display for RemoteCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IssueAssertion => write!(f, "assertion generator"),
            Self::Login => write!(f, "login"),
            Self::FriendRequest => write!(f, "friend request"),
            Self::FriendAccept => write!(f, "friend accept"),
            Self::SubmitGame => write!(f, "game submission"),
            Self::Purchase => write!(f, "purchase"),
            Self::GameDetail => write!(f, "game detail"),
            Self::StoreFlush => write!(f, "store flush"),
        }
    }
}

/// Coarse classification of a [`PrefillError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    Application,
    MalformedResponse,
    Cancelled,
    Internal,
}

/// Errors raised by remote calls and the stages that join on them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrefillError {
    #[error("connection to {call} failed: {message}")]
    Connection { call: RemoteCall, message: String },

    #[error("{call} failed: {code}")]
    Application { call: RemoteCall, code: String },

    #[error("malformed {call} response: {message}")]
    MalformedResponse { call: RemoteCall, message: String },

    #[error("cancelled after a sibling branch failed")]
    Cancelled,

    #[error("stage task failed: {0}")]
    TaskFailed(String),
}

pub type Result<T> = std::result::Result<T, PrefillError>;

impl PrefillError {
    pub fn connection(call: RemoteCall, message: impl Into<String>) -> Self {
        Self::Connection {
            call,
            message: message.into(),
        }
    }

    pub fn application(call: RemoteCall, code: impl Into<String>) -> Self {
        Self::Application {
            call,
            code: code.into(),
        }
    }

    pub fn malformed(call: RemoteCall, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            call,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Application { .. } => ErrorKind::Application,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::TaskFailed(_) => ErrorKind::Internal,
        }
    }

    /// The remote application code, if the endpoint sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Application { code, .. } => Some(code),
            _ => None,
        }
    }

    /// The call that produced this error, when it came from a remote call.
    pub fn call(&self) -> Option<RemoteCall> {
        match self {
            Self::Connection { call, .. }
            | Self::Application { call, .. }
            | Self::MalformedResponse { call, .. } => Some(*call),
            Self::Cancelled | Self::TaskFailed(_) => None,
        }
    }

    /// Whether this is a friend request that collided with an existing or
    /// pending relation.
    pub fn is_benign_friend_conflict(&self) -> bool {
        match self {
            Self::Application {
                call: RemoteCall::FriendRequest,
                code,
            } => BENIGN_FRIEND_CONFLICTS.contains(&code.as_str()),
            _ => false,
        }
    }
}
