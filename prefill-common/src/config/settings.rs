//! The run configuration and its loader.

use super::env::{EnvError, EnvParser};
use crate::types::{CatalogEntry, SubmissionDefaults};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "prefill.toml";

const MAX_USERS: usize = 1_000_000;
const MAX_CONCURRENCY: usize = 65_536;
const MAX_PER_USER: usize = 64;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid environment configuration: {}", format_env_errors(.0))]
    Env(Vec<EnvError>),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn format_env_errors(errors: &[EnvError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Everything a prefill run needs, passed explicitly into the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefillConfig {
    /// Base URL of the platform API.
    pub api_endpoint: String,
    /// Base URL of the assertion generator.
    pub assertion_endpoint: String,
    /// Audience sent with logins. Defaults to `api_endpoint`.
    pub audience: Option<String>,
    /// Number of synthetic identities to create.
    pub user_count: usize,
    /// Clear the backing store before Stage 1.
    pub flush_on_start: bool,
    /// `host:port` of the backing store, used only for the flush.
    pub store_addr: String,
    /// Upper bound on in-flight calls per stage.
    pub max_concurrency: usize,
    /// Signal sibling branches to stop once a stage has failed.
    pub cancel_on_abort: bool,
    /// Seed for peer and game sampling. Random when unset.
    pub seed: Option<u64>,
    /// Peers sampled per user for friend requests.
    pub friends_per_user: usize,
    /// Games sampled per user for purchases.
    pub purchases_per_user: usize,
    pub submission_defaults: SubmissionDefaults,
    pub catalog: Vec<CatalogEntry>,
}

impl Default for PrefillConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "http://localhost:5000".to_string(),
            assertion_endpoint: "http://localhost:9001".to_string(),
            audience: None,
            user_count: 100,
            flush_on_start: false,
            store_addr: "127.0.0.1:6379".to_string(),
            max_concurrency: 256,
            cancel_on_abort: false,
            seed: None,
            friends_per_user: 3,
            purchases_per_user: 2,
            submission_defaults: SubmissionDefaults::default(),
            catalog: CatalogEntry::default_catalog(),
        }
    }
}

impl PrefillConfig {
    /// Audience identifier sent alongside assertions at login.
    pub fn audience(&self) -> &str {
        self.audience.as_deref().unwrap_or(&self.api_endpoint)
    }

    /// Parse a TOML file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay `PREFILL_*` variables on top of the current values.
    pub fn apply_env(&mut self, parser: &mut EnvParser) {
        let api = parser.get_string("API_ENDPOINT", &self.api_endpoint);
        let assertion = parser.get_string("ASSERTION_ENDPOINT", &self.assertion_endpoint);
        let audience = parser.get_optional_string("AUDIENCE");
        let users = parser.get_usize_range("USER_COUNT", self.user_count, 0, MAX_USERS);
        let flush = parser.get_bool("FLUSH_ON_START", self.flush_on_start);
        let store = parser.get_string("STORE_ADDR", &self.store_addr);
        let concurrency =
            parser.get_usize_range("MAX_CONCURRENCY", self.max_concurrency, 1, MAX_CONCURRENCY);
        let cancel = parser.get_bool("CANCEL_ON_ABORT", self.cancel_on_abort);
        let seed = parser.get_optional_u64("SEED", self.seed);
        let friends = parser.get_usize_range("FRIENDS_PER_USER", self.friends_per_user, 0, MAX_PER_USER);
        let purchases =
            parser.get_usize_range("PURCHASES_PER_USER", self.purchases_per_user, 0, MAX_PER_USER);

        for (key, source) in [
            ("api_endpoint", api.source()),
            ("assertion_endpoint", assertion.source()),
            ("user_count", users.source()),
            ("flush_on_start", flush.source()),
            ("max_concurrency", concurrency.source()),
        ] {
            debug!(key, %source, "config value resolved");
        }

        self.api_endpoint = api.into_value();
        self.assertion_endpoint = assertion.into_value();
        if audience.is_from_env() {
            self.audience = audience.into_value();
        }
        self.user_count = users.into_value();
        self.flush_on_start = flush.into_value();
        self.store_addr = store.into_value();
        self.max_concurrency = concurrency.into_value();
        self.cancel_on_abort = cancel.into_value();
        self.seed = seed.into_value();
        self.friends_per_user = friends.into_value();
        self.purchases_per_user = purchases.into_value();
    }

    /// Check invariants the orchestrator relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("api_endpoint", &self.api_endpoint),
            ("assertion_endpoint", &self.assertion_endpoint),
        ] {
            reqwest::Url::parse(value).map_err(|e| ConfigError::Invalid {
                field,
                reason: format!("'{value}' is not a URL ({e})"),
            })?;
        }

        for (field, value, min, max) in [
            ("max_concurrency", self.max_concurrency, 1, MAX_CONCURRENCY),
            ("user_count", self.user_count, 0, MAX_USERS),
            ("friends_per_user", self.friends_per_user, 0, MAX_PER_USER),
            ("purchases_per_user", self.purchases_per_user, 0, MAX_PER_USER),
        ] {
            if !(min..=max).contains(&value) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{value} is outside {min}..={max}"),
                });
            }
        }

        if self.flush_on_start && self.store_addr.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "store_addr",
                reason: "required when flush_on_start is set".to_string(),
            });
        }

        if let Some(entry) = self
            .catalog
            .iter()
            .find(|g| g.name.trim().is_empty() || g.app_url.trim().is_empty())
        {
            return Err(ConfigError::Invalid {
                field: "catalog",
                reason: format!("entry {entry:?} needs both name and app_url"),
            });
        }

        Ok(())
    }
}

/// Build the run configuration from defaults, an optional file and the
/// environment.
///
/// File lookup order: `path`, then `PREFILL_CONFIG`, then
/// [`DEFAULT_CONFIG_FILE`] in the working directory if it exists.
pub fn load_config(path: Option<&Path>) -> Result<PrefillConfig, ConfigError> {
    let mut parser = EnvParser::new();

    let file = path
        .map(Path::to_path_buf)
        .or_else(|| parser.get_optional_string("CONFIG").into_value().map(PathBuf::from))
        .or_else(|| {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            local.exists().then_some(local)
        });

    let mut config = match file {
        Some(ref file) => {
            debug!(path = %file.display(), "loading config file");
            PrefillConfig::from_file(file)?
        }
        None => PrefillConfig::default(),
    };

    config.apply_env(&mut parser);
    if parser.has_errors() {
        return Err(ConfigError::Env(parser.take_errors()));
    }

    config.validate()?;
    Ok(config)
}
