//! Header Store
//!
//! On-disk cache of raw vendor headers, laid out as
//! `<root>/<version>/bassmix.h`. Missing headers are fetched once on
//! request; there is no retry and no partial-file recovery.

use bassmix_core::{Error, HeadersConfig, Result, Version};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::download::HeaderFetcher;

/// File name of the header inside each version directory
pub const HEADER_FILENAME: &str = "bassmix.h";

/// Directory holding the headers shipped with this crate
pub fn bundled_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("resources")
        .join("headers")
}

/// Header path for `version` under `root`
pub fn header_path(root: &Path, version: &Version) -> PathBuf {
    root.join(version.to_string()).join(HEADER_FILENAME)
}

/// Version-keyed header cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderStore {
    root: PathBuf,
}

impl HeaderStore {
    /// Create a store rooted at `root`
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Store over the headers bundled with the crate
    pub fn bundled() -> Self {
        Self::new(bundled_root())
    }

    /// Store described by a configuration
    pub fn from_config(config: &HeadersConfig) -> Self {
        match &config.headers_root {
            Some(root) => Self::new(root.clone()),
            None => Self::bundled(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the header for `version`, whether or not it exists
    pub fn resolve_path(&self, version: &Version) -> PathBuf {
        header_path(&self.root, version)
    }

    /// Whether the header for `version` is present
    pub fn exists(&self, version: &Version) -> bool {
        self.resolve_path(version).is_file()
    }

    /// Make sure the header for `version` is on disk, fetching it once if
    /// it is missing.
    pub fn ensure_available(&self, version: &Version, fetcher: &dyn HeaderFetcher) -> Result<PathBuf> {
        let path = self.resolve_path(version);
        if path.is_file() {
            debug!("Header for {} present at {:?}", version, path);
            return Ok(path);
        }

        info!("Header for {} missing, fetching into {:?}", version, self.root);
        if let Err(err) = fetcher.fetch(version, &self.root) {
            warn!("Fetching header for {} failed: {}", version, err);
            return Err(Error::UnavailableHeader {
                version: version.clone(),
                path,
                reason: err.to_string(),
            });
        }

        if !path.is_file() {
            return Err(Error::UnavailableHeader {
                version: version.clone(),
                path,
                reason: "fetch completed but the header is still missing".to_string(),
            });
        }

        Ok(path)
    }

    /// Versions with a header present in the store, oldest first
    pub fn available_versions(&self) -> Result<Vec<Version>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Ok(version) = Version::parse(&name.to_string_lossy()) else {
                continue;
            };
            if entry.path().join(HEADER_FILENAME).is_file() {
                versions.push(version);
            }
        }

        versions.sort();
        versions.dedup();
        Ok(versions)
    }
}

impl Default for HeaderStore {
    fn default() -> Self {
        Self::bundled()
    }
}
