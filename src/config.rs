//! Layered configuration
//!
//! Values come from `~/.logtide/config.toml` (or `--config`), then command
//! line flags, then `LOGTIDE_TOKEN` for the API token.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use logtide_stream::{DEFAULT_CAPACITY, DEFAULT_STREAM_URL};

/// Environment variable overriding the configured API token
pub const TOKEN_ENV: &str = "LOGTIDE_TOKEN";

const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the provider API
    pub api_url: String,

    /// Stream endpoint template; `{subject}` is replaced per session
    pub stream_url: String,

    /// Subject to stream for
    pub subject: Option<String>,

    /// Bearer token for the provider API
    pub token: Option<String>,

    pub buffer_capacity: usize,

    /// Give up on a connection attempt after this many seconds
    pub connect_timeout_secs: Option<u64>,

    /// Start streaming as soon as the viewer opens
    pub auto_start: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            stream_url: DEFAULT_STREAM_URL.to_string(),
            subject: None,
            token: None,
            buffer_capacity: DEFAULT_CAPACITY,
            connect_timeout_secs: None,
            auto_start: true,
        }
    }
}

/// Values given on the command line
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub stream_url: Option<String>,
    pub subject: Option<String>,
    pub connect_timeout_secs: Option<u64>,
}

impl Config {
    /// Directory holding the config file and the viewer's log
    pub fn state_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".logtide"))
    }

    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("config.toml"))
    }

    /// Where the viewer writes diagnostics when no log file is given
    pub fn default_log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("logtide.log"))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing default file yields defaults; a missing explicit file is an
    /// error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound && !explicit => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply command line flags and the token from the environment
    pub fn layer(mut self, overrides: Overrides, env_token: Option<String>) -> Self {
        if let Some(api_url) = overrides.api_url {
            self.api_url = api_url;
        }
        if let Some(stream_url) = overrides.stream_url {
            self.stream_url = stream_url;
        }
        if overrides.subject.is_some() {
            self.subject = overrides.subject;
        }
        if overrides.connect_timeout_secs.is_some() {
            self.connect_timeout_secs = overrides.connect_timeout_secs;
        }
        if let Some(token) = env_token.filter(|t| !t.trim().is_empty()) {
            self.token = Some(token);
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "buffer_capacity must be at least 1".to_string(),
            ));
        }
        if self.connect_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "connect_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.buffer_capacity, 200);
        assert!(config.auto_start);
        assert_eq!(config.connect_timeout(), None);
    }

    #[test]
    fn test_partial_file() {
        let config = Config::parse(
            r#"
            subject = "user-42"
            buffer_capacity = 50
            connect_timeout_secs = 5
            auto_start = false
            "#,
        )
        .unwrap();

        assert_eq!(config.subject.as_deref(), Some("user-42"));
        assert_eq!(config.buffer_capacity, 50);
        assert_eq!(config.connect_timeout(), Some(Duration::from_secs(5)));
        assert!(!config.auto_start);
        assert_eq!(config.stream_url, DEFAULT_STREAM_URL);
    }

    #[test]
    fn test_flags_and_env_override_file() {
        let config = Config::parse(
            r#"
            subject = "from-file"
            token = "file-token"
            api_url = "http://file:1"
            "#,
        )
        .unwrap();

        let overrides = Overrides {
            subject: Some("from-flag".to_string()),
            ..Default::default()
        };
        let config = config.layer(overrides, Some("env-token".to_string()));

        assert_eq!(config.subject.as_deref(), Some("from-flag"));
        assert_eq!(config.token.as_deref(), Some("env-token"));
        assert_eq!(config.api_url, "http://file:1");
    }

    #[test]
    fn test_blank_env_token_is_ignored() {
        let config = Config {
            token: Some("file-token".to_string()),
            ..Default::default()
        }
        .layer(Overrides::default(), Some("  ".to_string()));
        assert_eq!(config.token.as_deref(), Some("file-token"));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = Config {
            buffer_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let path = std::env::temp_dir().join("logtide-config-does-not-exist.toml");
        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let path = std::env::temp_dir().join(format!(
            "logtide-config-{}.toml",
            std::process::id()
        ));
        fs::write(&path, "buffer_capacity = \"lots\"").unwrap();
        let result = Config::load(Some(&path));
        let _ = fs::remove_file(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
