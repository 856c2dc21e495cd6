//! Shared types and utilities for galaxy-prefill.
//!
//! The orchestration crate (`prefill`) depends on this crate for the data
//! model of a prefill run, the error taxonomy used to classify remote
//! failures, configuration loading and logging setup.

pub mod config;
pub mod errors;
pub mod logging;
pub mod types;

pub use config::{ConfigError, EnvError, EnvParser, PrefillConfig, Sourced, load_config};
pub use errors::{BENIGN_FRIEND_CONFLICTS, ErrorKind, PrefillError, RemoteCall, Result};
pub use logging::{LogConfig, LogFormat, LoggingError, LoggingGuards, init_logging};
pub use types::{
    CatalogEntry, FriendEdge, FriendRequest, GameRecord, GameSubmission,
    PublicProfile, RunSummary, SubmissionDefaults, SyntheticIdentity, synthetic_email,
};
