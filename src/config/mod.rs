//! Configuration management for reeldigest.
//!
//! Configuration is read from `~/.config/reeldigest/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! The tracked usernames live in a separate plain-text file, see [`UserList`].

pub mod users;

pub use users::UserList;

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `telegram.bot_token`.
pub const BOT_TOKEN_ENV: &str = "REELDIGEST_BOT_TOKEN";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub digest: DigestConfig,
    pub fetch: FetchConfig,
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    /// Entries older than this are skipped; also the polling period.
    pub max_age_minutes: u64,
    /// Upper bound on the length of one delivered message, in characters.
    pub message_limit: usize,
    /// Defaults to `users.txt` next to the config file.
    pub users_file: Option<PathBuf>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            max_age_minutes: 60,
            message_limit: 4096,
            users_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub host: String,
    pub max_connections: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            host: "https://letterboxd.com".to_string(),
            max_connections: 25,
            timeout_secs: 20,
            user_agent: "reeldigest/0.1.0".to_string(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_url: String,
    pub bot_token: Option<String>,
    pub chat_id: Option<i64>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.telegram.org".to_string(),
            bot_token: None,
            chat_id: None,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()?,
        };

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
                path: config_path.clone(),
                source: e,
            })?;
            Self::from_toml(&content, &config_path)?
        } else {
            Self::create_default_config(&config_path)?;
            Self::default()
        };

        if config.digest.users_file.is_none() {
            config.digest.users_file = config_path.parent().map(|dir| dir.join("users.txt"));
        }
        config.apply_token_override(std::env::var(BOT_TOKEN_ENV).ok());
        config.validate()?;

        Ok(config)
    }

    fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/reeldigest/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("reeldigest").join("config.toml"))
    }

    pub fn users_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.digest.users_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::default_config_path()?.with_file_name("users.txt")),
        }
    }

    fn apply_token_override(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.telegram.bot_token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.digest.max_age_minutes == 0 {
            return Err(ConfigError::Invalid(
                "digest.max_age_minutes must be greater than zero".into(),
            ));
        }
        if self.digest.message_limit == 0 {
            return Err(ConfigError::Invalid(
                "digest.message_limit must be greater than zero".into(),
            ));
        }
        let urls = [
            ("fetch.host", &self.fetch.host),
            ("telegram.api_url", &self.telegram.api_url),
        ];
        for (key, value) in urls {
            url::Url::parse(value)
                .map_err(|e| ConfigError::Invalid(format!("{key} is not a valid URL: {e}")))?;
        }
        if self.fetch.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "fetch.max_connections must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# reeldigest configuration

[digest]
# Only entries published within this many minutes are reported.
# This is also how often the feeds are polled.
max_age_minutes = 60

# Longest message (in characters) sent in one piece.
message_limit = 4096

# One username per line. Defaults to users.txt next to this file.
# users_file = "/path/to/users.txt"

[fetch]
host = "https://letterboxd.com"

# Maximum simultaneous requests
max_connections = 25

# Per-request timeout in seconds
timeout_secs = 20

user_agent = "reeldigest/0.1.0"

[telegram]
api_url = "https://api.telegram.org"

# Can also be set with the REELDIGEST_BOT_TOKEN environment variable.
# bot_token = "123456:ABC..."
# chat_id = -1001234567890
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
