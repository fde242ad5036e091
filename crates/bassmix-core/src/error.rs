//! Error types for BassMix headers

use std::path::PathBuf;
use thiserror::Error;

use crate::platform::Platform;
use crate::version::Version;

/// BassMix headers error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid version format: {0:?}")]
    InvalidFormat(String),

    #[error("Platform [{platform}] not supported by version [{version}]")]
    UnsupportedPlatform { platform: Platform, version: Version },

    #[error("Header for version [{version}] unavailable at {}: {reason}", path.display())]
    UnavailableHeader {
        version: Version,
        path: PathBuf,
        reason: String,
    },

    #[error("Preprocessing {file} failed: {message}")]
    PreprocessingFailed { file: String, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for BassMix headers
pub type Result<T> = std::result::Result<T, Error>;
