//! Configuration types

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::version::Version;

/// Environment variable overriding the header store root
pub const HEADERS_DIR_ENV: &str = "BASSMIX_HEADERS_DIR";

/// Header store configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadersConfig {
    /// Header store root (`None` uses the headers bundled with the crate)
    pub headers_root: Option<PathBuf>,

    /// Download configuration
    pub download: DownloadConfig,
}

impl HeadersConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Default configuration with the store root taken from `BASSMIX_HEADERS_DIR`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from the environment
    pub fn apply_env(&mut self) {
        if let Some(dir) = std::env::var_os(HEADERS_DIR_ENV).filter(|d| !d.is_empty()) {
            debug!("Using header store from {}: {:?}", HEADERS_DIR_ENV, dir);
            self.headers_root = Some(PathBuf::from(dir));
        }
    }
}

/// Header bundle download configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Allow fetching missing headers over the network
    pub enabled: bool,

    /// Archive URL; `{version}` is replaced by the compact version (`24`)
    pub url_template: String,

    /// Path of the header inside the archive
    pub archive_entry: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url_template: "https://www.un4seen.com/files/bassmix{version}.zip".into(),
            archive_entry: "c/bassmix.h".into(),
        }
    }
}

impl DownloadConfig {
    /// Archive URL for a specific release
    pub fn url_for(&self, version: &Version) -> String {
        self.url_template.replace("{version}", &version.compact())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_download_url() {
        let config = DownloadConfig::default();
        let url = config.url_for(&Version::new(2, 4));
        assert_eq!(url, "https://www.un4seen.com/files/bassmix24.zip");
        assert_eq!(config.archive_entry, "c/bassmix.h");
    }

    #[test]
    fn test_load_partial_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("headers.json");
        fs::write(
            &path,
            r#"{ "headers_root": "/opt/bassmix", "download": { "enabled": false } }"#,
        )
        .unwrap();

        let config = HeadersConfig::load(&path).unwrap();
        assert_eq!(config.headers_root, Some(PathBuf::from("/opt/bassmix")));
        assert!(!config.download.enabled);
        assert_eq!(config.download.archive_entry, "c/bassmix.h");
    }

    #[test]
    fn test_load_invalid_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("headers.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(HeadersConfig::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = HeadersConfig::load(&temp.path().join("absent.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
