//! Configuration system for galaxy-prefill.
//!
//! A run is fully described by a [`PrefillConfig`] value. It is assembled from:
//! - built-in defaults (the fixed three-game catalog, 100 users, local endpoints)
//! - an optional TOML file
//! - `PREFILL_*` environment variables, parsed with error collection
//!
//! and validated before the orchestrator is constructed.

pub mod env;
pub mod settings;
pub mod source;

pub use env::{EnvError, EnvParser};
pub use settings::{ConfigError, DEFAULT_CONFIG_FILE, PrefillConfig, load_config};
pub use source::{ConfigSource, Sourced};

#[cfg(test)]
pub(crate) fn env_test_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
