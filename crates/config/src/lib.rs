//! Configuration loading, validation, and management for trustgate.
//!
//! Loads configuration from `~/.trustgate/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use trustgate_core::policy::EvidencePolicy;

/// The root configuration structure.
///
/// Maps directly to `~/.trustgate/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Corpus storage
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Evidence sufficiency thresholds and weights
    #[serde(default)]
    pub evidence: EvidencePolicy,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Reasoning engine settings
    #[serde(default)]
    pub reasoning: ReasoningConfig,
}

/// Which corpus backend to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorpusBackend {
    #[default]
    Sqlite,
    Memory,
}

impl fmt::Display for CorpusBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorpusBackend::Sqlite => f.write_str("sqlite"),
            CorpusBackend::Memory => f.write_str("memory"),
        }
    }
}

impl FromStr for CorpusBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(CorpusBackend::Sqlite),
            "memory" => Ok(CorpusBackend::Memory),
            other => Err(ConfigError::ValidationError(format!(
                "unknown corpus backend '{other}' (expected sqlite or memory)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusConfig {
    #[serde(default)]
    pub backend: CorpusBackend,

    /// SQLite database file; defaults to `~/.trustgate/corpus.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl CorpusConfig {
    /// Database file actually used by the sqlite backend.
    pub fn db_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("corpus.db"))
    }

    /// Connection string for sqlx.
    pub fn database_url(&self) -> String {
        format!("sqlite://{}", self.db_path().display())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// Extra regulatory scenarios (TOML) merged over the built-in catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenarios_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.trustgate/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `TRUSTGATE_DB_PATH`
    /// - `TRUSTGATE_CORPUS_BACKEND`
    /// - `TRUSTGATE_LOG`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply the environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(path) = lookup("TRUSTGATE_DB_PATH").filter(|p| !p.is_empty()) {
            self.corpus.path = Some(PathBuf::from(path));
        }

        if let Some(backend) = lookup("TRUSTGATE_CORPUS_BACKEND") {
            self.corpus.backend = backend.parse()?;
        }

        if let Some(level) = lookup("TRUSTGATE_LOG").filter(|l| !l.is_empty()) {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".trustgate")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.evidence
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("[evidence] {e}")))?;

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "logging.level must not be empty".into(),
            ));
        }

        if let Some(path) = &self.corpus.path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::ValidationError(
                    "corpus.path must not be empty".into(),
                ));
            }
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> Result<String, ConfigError> {
        toml::to_string_pretty(&Self::default())
            .map_err(|e| ConfigError::SerializeError(e.to_string()))
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Failed to serialize config: {0}")]
    SerializeError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use trustgate_core::source::AuthorityLevel;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.corpus.backend, CorpusBackend::Sqlite);
        assert_eq!(config.evidence.min_similarity, 0.5);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [corpus]
            backend = "memory"

            [evidence]
            min_similarity = 0.7

            [evidence.authority_floors]
            general = "industry"
            "#,
        )
        .unwrap();
        assert_eq!(config.corpus.backend, CorpusBackend::Memory);
        assert_eq!(config.evidence.min_similarity, 0.7);
        assert_eq!(config.evidence.conflict_window, 5);
        assert_eq!(config.evidence.authority_floors.general, AuthorityLevel::Industry);
        assert_eq!(config.evidence.authority_floors.regulatory, AuthorityLevel::Verified);
    }

    #[test]
    fn invalid_policy_rejected() {
        let mut config = AppConfig::default();
        config.evidence.min_similarity = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_similarity"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert_eq!(result.unwrap(), AppConfig::default());
    }

    #[test]
    fn invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[evidence]\nmin_similarity = \"high\"\n").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));

        std::fs::write(&path, "[evidence]\nconflict_window = 0\n").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("TRUSTGATE_DB_PATH", "/var/lib/trustgate/corpus.db"),
            ("TRUSTGATE_CORPUS_BACKEND", "memory"),
            ("TRUSTGATE_LOG", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.corpus.backend, CorpusBackend::Memory);
        assert_eq!(config.corpus.database_url(), "sqlite:///var/lib/trustgate/corpus.db");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn unknown_backend_override_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_overrides(|k| (k == "TRUSTGATE_CORPUS_BACKEND").then(|| "postgres".into()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml().unwrap();
        assert!(toml_str.contains("[evidence]"));
        assert!(toml_str.contains("min_similarity"));
        assert!(toml_str.contains("backend = \"sqlite\""));
        assert!(!toml_str.trim().is_empty());

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, AppConfig::default());
        assert!(parsed.validate().is_ok());
    }
}
