//! Configuration file loader.

use std::path::{Path, PathBuf};

use super::ParserConfig;

/// Configuration loader that searches multiple locations.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Search paths in order of priority.
    search_paths: Vec<PathBuf>,
    /// Set when the caller named the file; a missing file is then an error.
    explicit: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default search paths.
    #[must_use]
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        // 1. Current directory: .update-stat-parser.toml
        search_paths.push(PathBuf::from(".update-stat-parser.toml"));

        // 2. User config directory: ~/.config/update-stat-parser/config.toml
        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("update-stat-parser").join("config.toml"));
        }

        Self {
            search_paths,
            explicit: false,
        }
    }

    /// Create a config loader with a specific config file path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            search_paths: vec![path],
            explicit: true,
        }
    }

    /// Load configuration from the first available file, or return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed or fails
    /// validation, or if a path given to [`Self::with_path`] does not exist.
    pub fn load(&self) -> Result<ParserConfig, ConfigError> {
        if self.explicit {
            if let Some(path) = self.search_paths.iter().find(|p| !p.exists()) {
                return Err(ConfigError::NotFound { path: path.clone() });
            }
        }

        for path in &self.search_paths {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Loading config file");
                let config = Self::load_from_path(path)?;
                config.validate()?;
                return Ok(config);
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(ParserConfig::default())
    }

    /// Load configuration from a specific path.
    fn load_from_path(path: &Path) -> Result<ParserConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the search paths for debugging.
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Find the first config file that exists.
    #[must_use]
    pub fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths.iter().find(|p| p.exists()).cloned()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file {path} does not exist")]
    NotFound { path: PathBuf },

    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Column map names unknown column {name}")]
    UnknownColumn { name: String },

    #[error("Column map lacks required column {name}")]
    MissingColumn { name: String },

    #[error("Invalid common file mask {mask}: {source}")]
    InvalidMask {
        mask: String,
        source: globset::Error,
    },

    #[error("Invalid webhook URL {url}: {source}")]
    InvalidWebhookUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("Unsupported webhook scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    #[error("alert.silence_minutes must be greater than zero")]
    ZeroSilence,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_loader_default_paths() {
        let loader = ConfigLoader::new();
        assert!(!loader.search_paths().is_empty());
        assert!(loader.search_paths()[0].ends_with(".update-stat-parser.toml"));
    }

    #[test]
    fn test_config_loader_returns_defaults_when_no_file() {
        let loader = ConfigLoader {
            search_paths: vec![PathBuf::from("/nonexistent/path.toml")],
            explicit: false,
        };
        let config = loader.load().unwrap();
        assert!(config.session_roots.is_empty());
        assert_eq!(config.alert.silence_minutes, 30);
        assert!(loader.find_config_file().is_none());
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let loader = ConfigLoader::with_path(PathBuf::from("/nonexistent/path.toml"));
        let err = loader.load().unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
        assert_eq!(
            err.to_string(),
            "Config file /nonexistent/path.toml does not exist"
        );
    }

    #[test]
    fn test_parse_toml_config() {
        let toml_str = r#"
            database = "/var/lib/stat/stat.db"

            [[session_roots]]
            server = "srv1"
            path = "/data/srv1/Logs"

            [[common_roots]]
            server = "srv1"
            path = "/data/srv1/Stat"

            [common]
            file_mask = "stat*.csv"
            columns = [
                { name = "distr_number", index = 2 },
                { name = "computer", index = 3 },
                { name = "session_id", index = 5 },
                { name = "start_date", index = 6 },
            ]

            [alert]
            silence_minutes = 15
            webhook_url = "https://hooks.example.com/stat"

            [watch]
            debounce_ms = 250
        "#;

        let config: ParserConfig = toml::from_str(toml_str).unwrap();
        config.validate().unwrap();
        assert_eq!(config.database, PathBuf::from("/var/lib/stat/stat.db"));
        assert_eq!(config.session_roots.len(), 1);
        assert_eq!(config.session_roots[0].server, "srv1");
        assert_eq!(config.common.file_mask, "stat*.csv");
        assert_eq!(config.common.columns.len(), 4);
        assert_eq!(config.alert.silence_minutes, 15);
        assert_eq!(config.watch.debounce_ms, 250);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[alert]\nsilence_minutes = 0").unwrap();

        let loader = ConfigLoader::with_path(file.path().to_path_buf());
        assert!(matches!(loader.load(), Err(ConfigError::ZeroSilence)));
    }

    #[test]
    fn test_load_reports_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "session_roots = 5").unwrap();

        let loader = ConfigLoader::with_path(file.path().to_path_buf());
        assert!(matches!(loader.load(), Err(ConfigError::ParseError { .. })));
    }
}
