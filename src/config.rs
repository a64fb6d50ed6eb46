//! Configuration module for gator.
//!
//! The config file doubles as the CLI's session state: `register`, `login`
//! and `reset` rewrite `current_user_name` in place.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::scraper::{DatePolicy, FeedErrorPolicy};
use crate::{GatorError, Result};

/// File name used when no explicit config path is given.
pub const CONFIG_FILE_NAME: &str = ".gatorconfig.toml";

/// Environment variable that points at an alternative config file.
pub const CONFIG_PATH_ENV: &str = "GATOR_CONFIG";

/// Environment variable that overrides `database.url`.
pub const DATABASE_URL_ENV: &str = "GATOR_DATABASE_URL";

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Connection URL (`sqlite://...` or `postgres://...`).
    #[serde(default = "default_db_url")]
    pub url: String,
    /// Maximum pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_url() -> String {
    "sqlite://gator.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty means console only.
    #[serde(default)]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: String::new(),
        }
    }
}

/// Scraper configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    /// Feeds polled per cycle.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// What a failing feed does to the rest of its cycle.
    #[serde(default)]
    pub on_feed_error: FeedErrorPolicy,
    /// What an unparseable publish date does to the rest of its feed.
    #[serde(default)]
    pub on_bad_date: DatePolicy,
}

fn default_batch_size() -> u32 {
    3
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    20
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
            on_feed_error: FeedErrorPolicy::default(),
            on_bad_date: DatePolicy::default(),
        }
    }
}

/// Output formatting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// Timezone for displaying dates (e.g., "Europe/Berlin", "UTC").
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// User the CLI acts as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user_name: Option<String>,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Scraper configuration.
    #[serde(default)]
    pub scraper: ScraperConfig,
    /// Display configuration.
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Config {
    /// Resolve the config path: explicit argument, then `GATOR_CONFIG`,
    /// then `~/.gatorconfig.toml`.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }
        match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(CONFIG_FILE_NAME),
            None => PathBuf::from(CONFIG_FILE_NAME),
        }
    }

    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(GatorError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration, falling back to defaults when the file does not
    /// exist yet, then apply environment overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = if path.as_ref().exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| GatorError::Config(format!("config parse error: {e}")))
    }

    /// Write the configuration back to disk.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GatorError::Config(format!("config serialize error: {e}")))?;
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Set (or clear) the current user and persist it.
    ///
    /// The file is re-read before writing so environment overrides applied
    /// to `self` never end up on disk.
    pub fn set_user<P: AsRef<Path>>(&mut self, name: Option<&str>, path: P) -> Result<()> {
        self.current_user_name = name.map(str::to_string);

        let mut on_disk = if path.as_ref().exists() {
            Self::load(path.as_ref())?
        } else {
            Self::default()
        };
        on_disk.current_user_name = self.current_user_name.clone();
        on_disk.save(path)
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `GATOR_DATABASE_URL`: Override the database URL
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.is_empty() {
                self.database.url = url;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.scraper.batch_size == 0 {
            return Err(GatorError::Config(
                "scraper.batch_size must be at least 1".to_string(),
            ));
        }
        if self.display.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(GatorError::Config(format!(
                "unknown display.timezone: {}",
                self.display.timezone
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.current_user_name.is_none());
        assert_eq!(config.database.url, "sqlite://gator.db");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_empty());
        assert_eq!(config.scraper.batch_size, 3);
        assert_eq!(config.scraper.connect_timeout_secs, 10);
        assert_eq!(config.scraper.read_timeout_secs, 20);
        assert_eq!(config.scraper.total_timeout_secs, 30);
        assert_eq!(config.scraper.max_redirects, 5);
        assert_eq!(config.scraper.max_feed_size_bytes, 5 * 1024 * 1024);
        assert_eq!(config.scraper.on_feed_error, FeedErrorPolicy::Isolate);
        assert_eq!(config.scraper.on_bad_date, DatePolicy::SkipItem);
        assert_eq!(config.display.timezone, "UTC");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
current_user_name = "alice"

[database]
url = "postgres://gator@localhost/gator"
max_connections = 10

[logging]
level = "debug"
file = "logs/gator.log"

[scraper]
batch_size = 5
connect_timeout_secs = 3
read_timeout_secs = 4
total_timeout_secs = 6
max_redirects = 2
max_feed_size_bytes = 1024
on_feed_error = "halt"
on_bad_date = "abort"

[display]
timezone = "Europe/Berlin"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.current_user_name.as_deref(), Some("alice"));
        assert_eq!(config.database.url, "postgres://gator@localhost/gator");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "logs/gator.log");
        assert_eq!(config.scraper.batch_size, 5);
        assert_eq!(config.scraper.connect_timeout_secs, 3);
        assert_eq!(config.scraper.read_timeout_secs, 4);
        assert_eq!(config.scraper.total_timeout_secs, 6);
        assert_eq!(config.scraper.max_redirects, 2);
        assert_eq!(config.scraper.max_feed_size_bytes, 1024);
        assert_eq!(config.scraper.on_feed_error, FeedErrorPolicy::Halt);
        assert_eq!(config.scraper.on_bad_date, DatePolicy::AbortBatch);
        assert_eq!(config.display.timezone, "Europe/Berlin");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[scraper]
batch_size = 7
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.scraper.batch_size, 7);
        assert_eq!(config.scraper.total_timeout_secs, 30);
        assert_eq!(config.database.url, "sqlite://gator.db");
        assert!(config.current_user_name.is_none());
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");

        assert!(result.is_err());
        if let Err(GatorError::Config(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_parse_unknown_policy() {
        let result = Config::parse("[scraper]\non_feed_error = \"explode\"\n");
        assert!(matches!(result, Err(GatorError::Config(_))));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");

        assert!(matches!(result, Err(GatorError::Io(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.scraper.batch_size, 3);
    }

    #[test]
    fn test_set_user_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gator.toml");

        let mut config = Config::default();
        config.scraper.batch_size = 9;
        config.save(&path).unwrap();
        config.set_user(Some("bob"), &path).unwrap();
        assert_eq!(config.current_user_name.as_deref(), Some("bob"));

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.current_user_name.as_deref(), Some("bob"));
        assert_eq!(loaded.scraper.batch_size, 9);

        let mut loaded = loaded;
        loaded.set_user(None, &path).unwrap();
        let cleared = Config::load(&path).unwrap();
        assert!(cleared.current_user_name.is_none());
    }

    #[test]
    fn test_set_user_keeps_overrides_off_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gator.toml");
        Config::default().save(&path).unwrap();

        let mut config = Config::load(&path).unwrap();
        config.database.url = "postgres://override/gator".to_string();
        config.set_user(Some("carol"), &path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.current_user_name.as_deref(), Some("carol"));
        assert_eq!(loaded.database.url, "sqlite://gator.db");
    }

    #[test]
    fn test_resolve_path_explicit_wins() {
        let path = Config::resolve_path(Some(Path::new("/tmp/custom.toml")));
        assert_eq!(path, PathBuf::from("/tmp/custom.toml"));
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let mut config = Config::default();
        config.scraper.batch_size = 0;
        assert!(matches!(config.validate(), Err(GatorError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_timezone() {
        let mut config = Config::default();
        config.display.timezone = "Mars/Olympus_Mons".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus_Mons"));
    }

    #[test]
    fn test_validate_default() {
        assert!(Config::default().validate().is_ok());
    }
}
