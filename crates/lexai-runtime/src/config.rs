//! Runtime configuration.
//!
//! Loaded once at startup and shared read-only afterwards. Sources, later
//! ones winning:
//! 1. Built-in defaults
//! 2. A YAML file (explicit path, else `LEXAI_CONFIG`)
//! 3. `LEXAI_*` environment variables (a `.env` file is read first)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the YAML config file.
pub const CONFIG_PATH_ENV: &str = "LEXAI_CONFIG";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_PRIMARY_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_FALLBACK_MODEL: &str = "gemini-1.0-pro";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";

/// Errors from loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid duration in {field}: {message}")]
    InvalidDuration { field: String, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for talking to the model provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// API root, without a trailing `/models`
    pub base_url: String,

    /// API key; falls back to `GEMINI_API_KEY` when unset
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// First model tried for analysis
    pub primary_model: String,

    /// Model tried when the primary attempt fails
    pub fallback_model: String,

    /// Model used for chat
    pub chat_model: String,

    /// Upper bound on one upstream call (e.g., "60s", "2m")
    #[serde(with = "duration_str")]
    pub request_timeout: Duration,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            primary_model: DEFAULT_PRIMARY_MODEL.to_string(),
            fallback_model: DEFAULT_FALLBACK_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            request_timeout: Duration::from_secs(60),
            temperature: None,
            max_output_tokens: None,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from defaults, an optional YAML file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(env_path) => tracing::debug!(path = %env_path.display(), "Loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
        }

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(&path).map_err(|source| {
                    ConfigError::Io {
                        path: path.clone(),
                        source,
                    }
                })?;
                let config = Self::from_yaml(&contents)?;
                tracing::info!(path = %path.display(), "Loaded configuration");
                config
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML document; missing fields keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply `LEXAI_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("LEXAI_BASE_URL") {
            self.base_url = url;
        }
        if let Some(model) = lookup("LEXAI_PRIMARY_MODEL") {
            self.primary_model = model;
        }
        if let Some(model) = lookup("LEXAI_FALLBACK_MODEL") {
            self.fallback_model = model;
        }
        if let Some(model) = lookup("LEXAI_CHAT_MODEL") {
            self.chat_model = model;
        }
        if let Some(timeout) = lookup("LEXAI_REQUEST_TIMEOUT") {
            self.request_timeout =
                humantime::parse_duration(&timeout).map_err(|e| ConfigError::InvalidDuration {
                    field: "LEXAI_REQUEST_TIMEOUT".to_string(),
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Check invariants the orchestrators rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, model) in [
            ("primary_model", &self.primary_model),
            ("fallback_model", &self.fallback_model),
            ("chat_model", &self.chat_model),
        ] {
            if model.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{} must not be empty", field)));
            }
        }

        if self.primary_model == self.fallback_model {
            return Err(ConfigError::Invalid(
                "fallback_model must differ from primary_model".to_string(),
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(
                "base_url must start with http:// or https://".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "request_timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.primary_model, "gemini-2.5-flash");
        assert_eq!(config.fallback_model, "gemini-1.0-pro");
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = RuntimeConfig::from_yaml(
            r#"
primary_model: "gemini-2.5-pro"
request_timeout: "2m 30s"
temperature: 0.2
"#,
        )
        .unwrap();

        assert_eq!(config.primary_model, "gemini-2.5-pro");
        assert_eq!(config.fallback_model, DEFAULT_FALLBACK_MODEL);
        assert_eq!(config.request_timeout, Duration::from_secs(150));
        assert_eq!(config.temperature, Some(0.2));
    }

    #[test]
    fn test_bad_duration_in_yaml() {
        let result = RuntimeConfig::from_yaml("request_timeout: \"soon\"");
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("LEXAI_PRIMARY_MODEL", "model-a"),
            ("LEXAI_FALLBACK_MODEL", "model-b"),
            ("LEXAI_REQUEST_TIMEOUT", "15s"),
        ]
        .into_iter()
        .collect();

        let mut config = RuntimeConfig::default();
        config
            .apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.primary_model, "model-a");
        assert_eq!(config.fallback_model, "model-b");
        assert_eq!(config.chat_model, DEFAULT_CHAT_MODEL);
        assert_eq!(config.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_env_override_bad_duration() {
        let mut config = RuntimeConfig::default();
        let result = config.apply_env_overrides(|key| {
            (key == "LEXAI_REQUEST_TIMEOUT").then(|| "fast".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidDuration { .. })));
    }

    #[test]
    fn test_validate_rejects_same_tiers() {
        let config = RuntimeConfig {
            fallback_model: DEFAULT_PRIMARY_MODEL.to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let config = RuntimeConfig {
            base_url: "generativelanguage.googleapis.com".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_never_serialized() {
        let config = RuntimeConfig {
            api_key: Some("AIza-secret".to_string()),
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("AIza-secret"));
        assert!(yaml.contains("request_timeout: 1m"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = RuntimeConfig::load(Some(Path::new("/nonexistent/lexai.yaml")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
