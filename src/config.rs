//! Configuration file parser for the newswire daemon.
//!
//! The config file is TOML and is required at startup: it names the feed
//! sources and the destination topic, neither of which has a sensible
//! default. Every other key falls back to `Default::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields`
//! off), though we log a warning when the file contains potential typos.
use crate::publish::BackoffPolicy;
use crate::util::validate_url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level daemon configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified, but [`Config::validate`] rejects a config without sources,
/// a topic, and an endpoint.
///
/// Custom Debug impl masks `token` to prevent secret leakage in logs,
/// error messages, and debug output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ordered list of feed URLs to poll. Fixed for the process lifetime.
    pub sources: Vec<String>,

    /// Destination topic name on the publish endpoint.
    pub topic: String,

    /// Base URL of the publish API (e.g. "https://pubsub.example.com/v1").
    pub endpoint: String,

    /// Seconds between pipeline cycles.
    pub poll_interval_secs: u64,

    /// Minimum plain-text length (in characters) for a record to be
    /// published. Records below this are skipped without a network call.
    pub min_plain_chars: usize,

    /// Token separating title from content in the published payload.
    /// Downstream consumers split on it.
    pub content_separator: String,

    /// Per-request timeout in seconds for feed, article, and publish calls.
    pub request_timeout_secs: u64,

    /// Bearer token for the publish endpoint (alternative to the
    /// NEWSWIRE_TOKEN env var). Env var takes precedence.
    pub token: Option<String>,

    /// Path to a file holding the bearer token. Re-read on auth failure,
    /// so an external rotation becomes visible without a restart.
    pub token_file: Option<PathBuf>,

    /// Retry policy for outbound publish calls.
    pub backoff: BackoffPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            topic: String::new(),
            endpoint: String::new(),
            poll_interval_secs: 300,
            min_plain_chars: 400,
            content_separator: "###CONTENT: ".to_string(),
            request_timeout_secs: 30,
            token: None,
            token_file: None,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Mask the bearer token in Debug output to prevent secret leakage.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("sources", &self.sources)
            .field("topic", &self.topic)
            .field("endpoint", &self.endpoint)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("min_plain_chars", &self.min_plain_chars)
            .field("content_separator", &self.content_separator)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("token_file", &self.token_file)
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Err(ConfigError::Io)` (sources and topic are
    ///   required, so there is no useful default config)
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged
    ///   as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to prevent memory exhaustion
        // from a maliciously large or corrupted config file.
        let meta = std::fs::metadata(path)?;
        if meta.len() > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "Config file is {} bytes (max {} bytes)",
                meta.len(),
                Self::MAX_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path)?;

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "sources",
                "topic",
                "endpoint",
                "poll_interval_secs",
                "min_plain_chars",
                "content_separator",
                "request_timeout_secs",
                "token",
                "token_file",
                "backoff",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            sources = config.sources.len(),
            topic = %config.topic,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Validate the loaded configuration.
    ///
    /// Checks that at least one source is configured, that every source is
    /// a well-formed public http(s) URL, that the topic is non-empty, and
    /// that the endpoint parses as a URL (the endpoint may legitimately be
    /// internal, so it skips the private-address check). Called once at
    /// startup; a failure here is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid(
                "no feed sources configured".to_string(),
            ));
        }
        for source in &self.sources {
            validate_url(source).map_err(|e| {
                ConfigError::Invalid(format!("source '{}' rejected: {}", source, e))
            })?;
        }
        if self.topic.trim().is_empty() {
            return Err(ConfigError::Invalid("topic must not be empty".to_string()));
        }
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "endpoint must not be empty".to_string(),
            ));
        }
        url::Url::parse(&self.endpoint)
            .map_err(|e| ConfigError::Invalid(format!("endpoint rejected: {}", e)))?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir_name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(dir_name);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    const MINIMAL: &str = r#"
sources = ["https://example.com/feed.xml"]
topic = "news"
endpoint = "https://pubsub.example.com/v1"
"#;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.poll_interval_secs, 300);
        assert_eq!(config.min_plain_chars, 400);
        assert_eq!(config.content_separator, "###CONTENT: ");
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.sources.is_empty());
        assert!(config.token.is_none());
        assert!(config.token_file.is_none());
    }

    #[test]
    fn test_missing_file_is_error() {
        let path = Path::new("/tmp/newswire_test_nonexistent_config.toml");
        assert!(Config::load(path).is_err());
    }

    #[test]
    fn test_minimal_config_uses_defaults_for_missing() {
        let path = write_config("newswire_config_test_minimal", MINIMAL);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.topic, "news");
        assert_eq!(config.poll_interval_secs, 300); // default
        assert_eq!(config.min_plain_chars, 400); // default
        assert!(config.validate().is_ok());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_full_config() {
        let content = r#"
sources = ["https://example.com/a.xml", "https://example.com/b.xml"]
topic = "headlines"
endpoint = "https://pubsub.example.com/v1"
poll_interval_secs = 60
min_plain_chars = 250
content_separator = "|||"
request_timeout_secs = 10
token = "test-token-123"

[backoff]
initial_interval_ms = 100
multiplier = 1.5
max_interval_ms = 5000
max_elapsed_ms = 20000
"#;
        let path = write_config("newswire_config_test_full", content);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.topic, "headlines");
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.min_plain_chars, 250);
        assert_eq!(config.content_separator, "|||");
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.token.as_deref(), Some("test-token-123"));
        assert_eq!(config.backoff.initial_interval_ms, 100);
        assert_eq!(config.backoff.multiplier, 1.5);
        assert_eq!(config.backoff.max_interval_ms, 5000);
        assert_eq!(config.backoff.max_elapsed_ms, 20000);
        assert!(config.validate().is_ok());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let path = write_config("newswire_config_test_invalid", "this is not [valid toml");

        let result = Config::load(&path);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let content = format!("{}\ntotally_fake_key = 42\n", MINIMAL);
        let path = write_config("newswire_config_test_unknown", &content);

        let config = Config::load(&path).unwrap();
        assert_eq!(config.topic, "news");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let path = write_config(
            "newswire_config_test_wrongtype",
            "poll_interval_secs = \"soon\"\n",
        );
        assert!(Config::load(&path).is_err());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let content = "a".repeat(1_048_577);
        let path = write_config("newswire_config_test_too_large", &content);

        let result = Config::load(&path);
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::TooLarge(_)));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_validate_rejects_empty_sources() {
        let config = Config {
            topic: "news".to_string(),
            endpoint: "https://pubsub.example.com".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_topic() {
        let config = Config {
            sources: vec!["https://example.com/feed.xml".to_string()],
            endpoint: "https://pubsub.example.com".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_source_url() {
        let config = Config {
            sources: vec!["file:///etc/passwd".to_string()],
            topic: "news".to_string(),
            endpoint: "https://pubsub.example.com".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_private_source() {
        let config = Config {
            sources: vec!["http://192.168.1.1/feed.xml".to_string()],
            topic: "news".to_string(),
            endpoint: "https://pubsub.example.com".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_masks_token() {
        let config = Config {
            token: Some("super-secret-token-12345".to_string()),
            ..Config::default()
        };

        let debug_output = format!("{:?}", config);
        assert!(
            !debug_output.contains("super-secret-token-12345"),
            "Debug output should not contain the token"
        );
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should show [REDACTED] for the token"
        );
    }
}
