//! Engine configuration: endpoint bases, timeouts, and retry tuning.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde, though we log a warning when
//! the file contains potential typos.
use crate::net::RetryPolicy;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

/// Engine configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified; missing keys fall back to the production endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Action API endpoint used for redirect lookups.
    pub api_base: String,

    /// REST content API base used by the article fetch fallback chain.
    pub rest_base: String,

    /// Hard wall-clock ceiling for one full redirect resolution, in seconds.
    /// Independent of the retry executor's per-call timeouts.
    pub resolve_deadline_secs: u64,

    /// Retry attempts per network call, including the first.
    pub max_attempts: u32,

    /// Backoff base delay in milliseconds.
    pub initial_delay_ms: u64,

    /// Backoff cap in milliseconds.
    pub max_delay_ms: u64,

    pub backoff_multiplier: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "https://en.wikipedia.org/w/api.php".to_string(),
            rest_base: "https://en.wikipedia.org/api/rest_v1".to_string(),
            resolve_deadline_secs: 5,
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 4000,
            backoff_multiplier: 2.0,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "api_base",
                "rest_base",
                "resolve_deadline_secs",
                "max_attempts",
                "initial_delay_ms",
                "max_delay_ms",
                "backoff_multiplier",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), api_base = %config.api_base, "Loaded configuration");
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
        }
    }

    pub fn resolve_deadline(&self) -> Duration {
        Duration::from_secs(self.resolve_deadline_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.api_base.contains("wikipedia.org"));
        assert_eq!(config.resolve_deadline_secs, 5);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_delay_ms, 1000);
        assert_eq!(config.max_delay_ms, 4000);
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/wikibingo_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let dir = std::env::temp_dir().join("wikibingo_config_test_partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "resolve_deadline_secs = 10\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.resolve_deadline_secs, 10);
        assert_eq!(config.max_attempts, 3); // default

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let dir = std::env::temp_dir().join("wikibingo_config_test_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "this is not [valid toml").unwrap();

        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_retry_policy_mapping() {
        let config = Config {
            max_attempts: 5,
            initial_delay_ms: 200,
            max_delay_ms: 800,
            backoff_multiplier: 2.0,
            ..Config::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_delay, Duration::from_millis(200));
        assert_eq!(policy.max_delay, Duration::from_millis(800));
    }

    #[test]
    fn test_zero_values_clamped() {
        let config = Config {
            max_attempts: 0,
            resolve_deadline_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.retry_policy().max_attempts, 1);
        assert_eq!(config.resolve_deadline(), Duration::from_secs(1));
    }
}
