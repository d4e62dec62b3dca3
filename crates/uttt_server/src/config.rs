//! Engine and storage configuration.

use crate::opponent::ComputeBudget;
use crate::session::SessionSettings;
use crate::snapshot::SnapshotPolicy;
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Environment variable overriding [`EngineConfig::engine_url`].
pub const ENGINE_URL_VAR: &str = "UTTT_ENGINE_URL";

/// Environment variable overriding [`EngineConfig::database_path`].
pub const DATABASE_VAR: &str = "UTTT_DATABASE";

/// Configuration for the opponent engine and the match store.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
pub struct EngineConfig {
    /// URL of the engine's move endpoint.
    #[serde(default = "default_engine_url")]
    engine_url: String,

    /// Search time requested per move.
    #[serde(default = "default_compute_time_seconds")]
    compute_time_seconds: u64,

    /// Ask the engine to use its full time.
    #[serde(default)]
    force_full_time: bool,

    /// Extra wait on top of the search time before giving up.
    #[serde(default = "default_grace_seconds")]
    grace_seconds: u64,

    /// Send the request body as a JSON-encoded string.
    #[serde(default)]
    legacy_string_body: bool,

    /// SQLite database file.
    #[serde(default = "default_database_path")]
    database_path: String,

    /// How snapshots are restored.
    #[serde(default)]
    snapshot_policy: SnapshotPolicy,
}

#[instrument]
fn default_engine_url() -> String {
    "http://127.0.0.1:5000/api/makemove/".to_string()
}

#[instrument]
fn default_compute_time_seconds() -> u64 {
    15
}

#[instrument]
fn default_grace_seconds() -> u64 {
    5
}

#[instrument]
fn default_database_path() -> String {
    "uttt.db".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine_url: default_engine_url(),
            compute_time_seconds: default_compute_time_seconds(),
            force_full_time: false,
            grace_seconds: default_grace_seconds(),
            legacy_string_body: false,
            database_path: default_database_path(),
            snapshot_policy: SnapshotPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the text is not valid configuration.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml(&content)?;
        info!(engine_url = %config.engine_url, "Config loaded successfully");
        Ok(config)
    }

    /// Loads `path` if given, defaults otherwise, then applies environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_overrides(
            std::env::var(ENGINE_URL_VAR).ok(),
            std::env::var(DATABASE_VAR).ok(),
        ))
    }

    /// Replaces the engine URL and database path where given.
    pub fn with_overrides(
        mut self,
        engine_url: Option<String>,
        database_path: Option<String>,
    ) -> Self {
        if let Some(url) = engine_url.filter(|u| !u.trim().is_empty()) {
            debug!(engine_url = %url, "Engine URL overridden");
            self.engine_url = url;
        }
        if let Some(path) = database_path.filter(|p| !p.trim().is_empty()) {
            debug!(database_path = %path, "Database path overridden");
            self.database_path = path;
        }
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.compute_time_seconds == 0 {
            return Err(ConfigError::new("compute_time_seconds must be positive"));
        }
        if self.engine_url.trim().is_empty() {
            return Err(ConfigError::new("engine_url must not be empty"));
        }
        Ok(())
    }

    /// Budget for each opponent request.
    pub fn budget(&self) -> ComputeBudget {
        ComputeBudget::new(
            Duration::from_secs(self.compute_time_seconds),
            self.force_full_time,
            Duration::from_secs(self.grace_seconds),
        )
    }

    /// Settings for a session manager.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings::new(self.budget(), self.snapshot_policy)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
