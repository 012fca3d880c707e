//! Configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::parser::{column_kind, default_column_map, ColumnMapping, REQUIRED_COLUMNS};
use crate::store::default_database_path;

use super::ConfigError;

/// A watched directory and the server it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchRoot {
    /// Server name recorded on files and summaries from this root.
    #[serde(default)]
    pub server: String,
    pub path: PathBuf,
}

impl WatchRoot {
    #[must_use]
    pub fn new(server: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            server: server.into(),
            path: path.into(),
        }
    }
}

/// Aggregate statistics export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonConfig {
    /// Glob matched against file names in common roots.
    #[serde(default = "default_file_mask")]
    pub file_mask: String,
    /// Column map for export lines.
    #[serde(default = "default_column_map")]
    pub columns: Vec<ColumnMapping>,
}

fn default_file_mask() -> String {
    "clientstat*.csv".to_string()
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            file_mask: default_file_mask(),
            columns: default_column_map(),
        }
    }
}

/// Silence alerting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Minutes without file events before alerting.
    #[serde(default = "default_silence_minutes")]
    pub silence_minutes: u64,
    /// Webhook receiving JSON alerts. Alerts are only logged when unset.
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_webhook_timeout_secs")]
    pub webhook_timeout_secs: u64,
}

fn default_silence_minutes() -> u64 {
    30
}

fn default_webhook_timeout_secs() -> u64 {
    10
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            silence_minutes: default_silence_minutes(),
            webhook_url: None,
            webhook_timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

/// Filesystem watching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce window for filesystem events.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    500
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
    /// Roots laid out as `<root>/<YYYY_MM_DD>/<file>`.
    #[serde(default)]
    pub session_roots: Vec<WatchRoot>,
    /// Roots holding aggregate statistics exports.
    #[serde(default)]
    pub common_roots: Vec<WatchRoot>,
    #[serde(default)]
    pub common: CommonConfig,
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            session_roots: Vec::new(),
            common_roots: Vec::new(),
            common: CommonConfig::default(),
            alert: AlertConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl ParserConfig {
    /// Check values that deserialization alone cannot.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for mapping in &self.common.columns {
            if column_kind(&mapping.name).is_none() {
                return Err(ConfigError::UnknownColumn {
                    name: mapping.name.clone(),
                });
            }
        }
        for required in REQUIRED_COLUMNS {
            if !self.common.columns.iter().any(|c| c.name == *required) {
                return Err(ConfigError::MissingColumn {
                    name: (*required).to_string(),
                });
            }
        }

        globset::Glob::new(&self.common.file_mask).map_err(|source| {
            ConfigError::InvalidMask {
                mask: self.common.file_mask.clone(),
                source,
            }
        })?;

        if self.alert.silence_minutes == 0 {
            return Err(ConfigError::ZeroSilence);
        }

        if let Some(raw) = &self.alert.webhook_url {
            let url = url::Url::parse(raw).map_err(|source| ConfigError::InvalidWebhookUrl {
                url: raw.clone(),
                source,
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::UnsupportedScheme {
                    scheme: url.scheme().to_string(),
                });
            }
        }

        Ok(())
    }

    /// Session root for a server name.
    #[must_use]
    pub fn session_root(&self, server: &str) -> Option<&WatchRoot> {
        self.session_roots.iter().find(|r| r.server == server)
    }
}
