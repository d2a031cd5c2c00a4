//! Configuration types for logscope.
//!
//! [`Config::load`] reads `~/.config/logscope/config.toml`, creating it with
//! hardcoded defaults if it does not yet exist, then applies `LOGSCOPE__*`
//! environment overrides (e.g. `LOGSCOPE__SEARCH__ENVIRONMENT=production`).
//! [`Config::defaults`] returns the same defaults without touching the
//! filesystem (useful in tests).

use crate::error::{Error, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[search]
hosts        = ["http://127.0.0.1:9200"]
environment  = "development"
index_prefix = "api-logs"
time_zone    = "UTC"
"#;

const ENV_PREFIX: &str = "LOGSCOPE";

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level configuration, loaded from `~/.config/logscope/config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
}

/// `[search]` section of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Cluster endpoints, handed to whatever transport the caller builds.
    #[serde(default = "default_hosts")]
    pub hosts: Vec<String>,
    /// Deployment name baked into every partition name.
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_index_prefix")]
    pub index_prefix: String,
    /// IANA zone used to read time inputs and align histogram buckets.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

fn default_hosts() -> Vec<String> { vec!["http://127.0.0.1:9200".to_string()] }
fn default_environment() -> String { "development".to_string() }
fn default_index_prefix() -> String { "api-logs".to_string() }
fn default_time_zone() -> String { "UTC".to_string() }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            hosts: default_hosts(),
            environment: default_environment(),
            index_prefix: default_index_prefix(),
            time_zone: default_time_zone(),
        }
    }
}

impl SearchConfig {
    /// Resolve the parts a [`LogSearch`](crate::LogSearch) needs.
    pub fn settings(&self) -> Result<SearchSettings> {
        let time_zone = self
            .time_zone
            .parse::<Tz>()
            .map_err(|_| Error::UnknownTimeZone(self.time_zone.clone()))?;
        Ok(SearchSettings::new(
            self.environment.clone(),
            self.index_prefix.clone(),
            time_zone,
        ))
    }
}

/// Per-deployment inputs to a search, passed explicitly rather than read from
/// process state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSettings {
    pub environment: String,
    pub index_prefix: String,
    pub time_zone: Tz,
}

impl SearchSettings {
    pub fn new(environment: impl Into<String>, index_prefix: impl Into<String>, time_zone: Tz) -> Self {
        Self {
            environment: environment.into(),
            index_prefix: index_prefix.into(),
            time_zone,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load from `~/.config/logscope/config.toml`, layered on top of the
    /// built-in defaults. Creates the file with defaults if it does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, DEFAULT_CONFIG.trim_start())?;
        }

        Self::load_from(&path)
    }

    /// Load an explicit file over the built-in defaults. A missing file is
    /// not an error; the defaults and environment still apply.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        tracing::debug!(path = %path.display(), "config: loading");
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("search.hosts")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("logscope")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
