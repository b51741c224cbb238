//! Error types for the session engine and its hosting daemon

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read from {peer}: {source}")]
    Read {
        peer: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write to channel {handle}: {source}")]
    Write {
        handle: i32,
        #[source]
        source: io::Error,
    },

    #[error("Failed to release channel {handle}: {source}")]
    Release {
        handle: i32,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Command handler is busy")]
    HandlerBusy,
}

pub type Result<T> = std::result::Result<T, CliError>;
