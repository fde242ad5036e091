//! BassMix Core
//!
//! Version catalog, platform compatibility table, configuration and the
//! error type shared by the BassMix header crates.

pub mod config;
pub mod error;
pub mod platform;
pub mod version;

pub use config::{DownloadConfig, HeadersConfig};
pub use error::{Error, Result};
pub use platform::{is_supported, Bitness, Platform};
pub use version::{IntoVersion, Version};
