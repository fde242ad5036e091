//! Header and library downloads
//!
//! Fetches vendor archives over HTTP and extracts single entries from them.
//! Extraction writes to a uniquely named temporary file next to the target
//! and renames it into place, so concurrent or failed extractions never
//! leave a truncated header behind.

use bassmix_core::{DownloadConfig, HeadersConfig, Version};
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use crate::binary::VendorBinary;
use crate::store::header_path;

/// Download errors
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Downloads are disabled")]
    Disabled,

    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Archive has no entry {0}")]
    MissingEntry(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Produces a missing header under a store root
pub trait HeaderFetcher: Send + Sync {
    /// Place the header for `version` at `<root>/<version>/bassmix.h`
    fn fetch(&self, version: &Version, root: &Path) -> Result<(), DownloadError>;
}

/// Fetcher used when downloads are disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFetch;

impl HeaderFetcher for NoFetch {
    fn fetch(&self, version: &Version, _root: &Path) -> Result<(), DownloadError> {
        debug!("Not fetching header for {}: downloads disabled", version);
        Err(DownloadError::Disabled)
    }
}

/// Downloads vendor archives over HTTP
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    config: DownloadConfig,
}

impl HttpFetcher {
    pub fn new(config: DownloadConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Download a whole resource into memory
    fn get(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        info!("Downloading {}", url);

        let http_error = |source| DownloadError::Http {
            url: url.to_string(),
            source,
        };

        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("bassmix-headers/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(http_error)?;
        let response = client.get(url).send().map_err(http_error)?;

        if !response.status().is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().map_err(http_error)?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }

    /// Download a vendor library binary into `dest_dir`, unless it is
    /// already there. Returns the library path.
    pub fn fetch_binary(&self, binary: &VendorBinary, dest_dir: &Path) -> Result<PathBuf, DownloadError> {
        let dest = dest_dir.join(binary.filename);
        if dest.is_file() {
            debug!("Library {:?} already present", dest);
            return Ok(dest);
        }

        let archive = self.get(&binary.url)?;
        extract_entry(&archive, &binary.entry, &dest)?;
        Ok(dest)
    }
}

impl HeaderFetcher for HttpFetcher {
    fn fetch(&self, version: &Version, root: &Path) -> Result<(), DownloadError> {
        if !self.config.enabled {
            return Err(DownloadError::Disabled);
        }

        let archive = self.get(&self.config.url_for(version))?;
        extract_entry(&archive, &self.config.archive_entry, &header_path(root, version))
    }
}

/// Fetcher described by a configuration
pub fn fetcher_for(config: &HeadersConfig) -> Box<dyn HeaderFetcher> {
    if config.download.enabled {
        Box::new(HttpFetcher::new(config.download.clone()))
    } else {
        Box::new(NoFetch)
    }
}

/// Extract `entry` from a zip archive held in memory and write it to `dest`
pub fn extract_entry(archive: &[u8], entry: &str, dest: &Path) -> Result<(), DownloadError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))?;
    let mut file = match zip.by_name(entry) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(DownloadError::MissingEntry(entry.to_string()))
        }
        Err(err) => return Err(err.into()),
    };

    let parent = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut out = NamedTempFile::new_in(parent)?;
    io::copy(&mut file, &mut out)?;
    out.as_file().sync_all()?;
    out.persist(dest).map_err(|e| e.error)?;

    info!("Extracted {} to {:?}", entry, dest);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_extract_entry() {
        let temp = TempDir::new().unwrap();
        let bytes = archive(&[("bassmix.chm", "docs"), ("c/bassmix.h", "int header;")]);
        let dest = temp.path().join("2.4").join("bassmix.h");

        extract_entry(&bytes, "c/bassmix.h", &dest).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "int header;");
        assert_eq!(entries(&temp.path().join("2.4")), ["bassmix.h"]);
    }

    #[test]
    fn test_extract_replaces_existing_header() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("bassmix.h");
        fs::write(&dest, "int stale_header_with_a_longer_body;").unwrap();

        for body in ["int first;", "int second;"] {
            extract_entry(&archive(&[("c/bassmix.h", body)]), "c/bassmix.h", &dest).unwrap();
            assert_eq!(fs::read_to_string(&dest).unwrap(), body);
        }
        assert_eq!(entries(temp.path()), ["bassmix.h"]);
    }

    #[test]
    fn test_concurrent_extractions_leave_whole_header() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("bassmix.h");
        let body = "int header;\n".repeat(4096);
        let bytes = archive(&[("c/bassmix.h", body.as_str())]);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| extract_entry(&bytes, "c/bassmix.h", &dest).unwrap());
            }
        });

        assert_eq!(fs::read_to_string(&dest).unwrap(), body);
        assert_eq!(entries(temp.path()), ["bassmix.h"]);
    }

    #[test]
    fn test_extract_missing_entry() {
        let temp = TempDir::new().unwrap();
        let bytes = archive(&[("bassmix.chm", "docs")]);
        let dest = temp.path().join("bassmix.h");

        let err = extract_entry(&bytes, "c/bassmix.h", &dest).unwrap_err();
        assert!(matches!(err, DownloadError::MissingEntry(ref name) if name == "c/bassmix.h"));
        assert!(!dest.exists());
        assert!(entries(temp.path()).is_empty());
    }

    #[test]
    fn test_extract_invalid_archive() {
        let temp = TempDir::new().unwrap();
        let err = extract_entry(b"not a zip", "c/bassmix.h", &temp.path().join("x.h")).unwrap_err();
        assert!(matches!(err, DownloadError::Archive(_)));
    }

    #[test]
    fn test_no_fetch() {
        let temp = TempDir::new().unwrap();
        let err = NoFetch.fetch(&Version::latest(), temp.path()).unwrap_err();
        assert!(matches!(err, DownloadError::Disabled));
    }

    #[test]
    fn test_disabled_http_fetcher_makes_no_request() {
        let temp = TempDir::new().unwrap();
        let fetcher = HttpFetcher::new(DownloadConfig {
            enabled: false,
            url_template: "http://127.0.0.1:9/{version}.zip".into(),
            ..DownloadConfig::default()
        });
        let err = fetcher.fetch(&Version::latest(), temp.path()).unwrap_err();
        assert!(matches!(err, DownloadError::Disabled));
    }

    #[test]
    fn test_fetch_binary_skips_present_file() {
        let temp = TempDir::new().unwrap();
        let binary = VendorBinary {
            url: "http://127.0.0.1:9/never.zip".into(),
            entry: "x64/libbassmix.so".into(),
            filename: "libbassmix.so",
        };
        fs::write(temp.path().join("libbassmix.so"), b"\x7fELF").unwrap();

        let path = HttpFetcher::default().fetch_binary(&binary, temp.path()).unwrap();
        assert_eq!(path, temp.path().join("libbassmix.so"));
    }
}
