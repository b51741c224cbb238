//! Configuration for rift-cli.
//!
//! The configuration file is located at `~/.rift-cli/config.toml` unless
//! `--config <path>` is given:
//!
//! ```toml
//! # Name shown in the prompt and in log lines
//! name = "edge-1"
//!
//! # Attach a session to this terminal
//! interactive = true
//!
//! # Accept Telnet sessions
//! listen = "127.0.0.1:2323"
//!
//! [session]
//! history_limit = 100
//! read_chunk_size = 1024
//! gate_control_sequences = false
//!
//! [log]
//! level = "info"
//! file = "/tmp/rift-cli.log"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::session::{SessionOptions, READ_CHUNK_SIZE};
use crate::error::{CliError, Result};
use crate::history::HISTORY_LIMIT;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prompt and log name
    pub name: String,
    /// Run a session on stdin/stdout
    pub interactive: bool,
    /// `host:port` to accept Telnet connections on
    pub listen: Option<String>,
    pub session: SessionConfig,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "rift".to_string(),
            interactive: true,
            listen: None,
            session: SessionConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Per-session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub history_limit: usize,
    pub read_chunk_size: usize,
    /// Only send cursor control output while echo is negotiated
    pub gate_control_sequences: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: HISTORY_LIMIT,
            read_chunk_size: READ_CHUNK_SIZE,
            gate_control_sequences: false,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location; a missing file yields the defaults
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from `path`
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| CliError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Directory holding the config and default log file
    pub fn config_dir() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".rift-cli"))
    }

    /// Get config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Log file: configured, or `~/.rift-cli/rift-cli.log`
    pub fn log_path(&self) -> PathBuf {
        self.log
            .file
            .clone()
            .or_else(|| Self::config_dir().map(|dir| dir.join("rift-cli.log")))
            .unwrap_or_else(|| PathBuf::from("rift-cli.log"))
    }

    /// Session options for this configuration; the local-close hook keeps its default
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            read_chunk_size: self.session.read_chunk_size,
            history_limit: self.session.history_limit,
            gate_control_sequences: self.session.gate_control_sequences,
            ..SessionOptions::default()
        }
    }
}

/// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.name, "rift");
        assert!(config.interactive);
        assert_eq!(config.session.history_limit, 100);
        assert_eq!(config.session.read_chunk_size, 1024);
    }

    #[test]
    fn test_partial_config() {
        let config = Config::parse(
            r#"
name = "edge-1"
listen = "127.0.0.1:2323"

[session]
gate_control_sequences = true
"#,
        )
        .unwrap();
        assert_eq!(config.name, "edge-1");
        assert_eq!(config.listen.as_deref(), Some("127.0.0.1:2323"));
        assert!(config.session.gate_control_sequences);
        assert_eq!(config.session.history_limit, 100);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_session_options() {
        let mut config = Config::default();
        config.session.history_limit = 5;
        config.session.read_chunk_size = 16;
        let options = config.session_options();
        assert_eq!(options.history_limit, 5);
        assert_eq!(options.read_chunk_size, 16);
        assert!(!options.gate_control_sequences);
    }

    #[test]
    fn test_invalid_config() {
        assert!(Config::parse("interactive = \"yes\"").is_err());

        let path = std::env::temp_dir().join(format!("rift-cli-test-{}.toml", std::process::id()));
        fs::write(&path, "name = [").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, CliError::ConfigParse { .. }));
        let _ = fs::remove_file(&path);

        let err = Config::load_from(Path::new("/nonexistent/rift-cli.toml")).unwrap_err();
        assert!(matches!(err, CliError::ConfigRead { .. }));
    }

    #[test]
    fn test_explicit_log_file() {
        let mut config = Config::default();
        config.log.file = Some(PathBuf::from("/var/log/rift.log"));
        assert_eq!(config.log_path(), PathBuf::from("/var/log/rift.log"));
    }
}
