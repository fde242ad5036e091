//! BassMix header provider
//!
//! [`BassMix`] pairs a platform and a release with a header store and a
//! preprocessor. Constructing one only validates the pair and builds the
//! preprocessing context; nothing touches the disk or the network until
//! [`BassMix::ensure_available`] or [`BassMix::render`] is called.

use bassmix_core::{Bitness, Error, HeadersConfig, IntoVersion, Platform, Result, Version};
use bassmix_preprocessor::{get_preprocessor, PreprocessContext, Preprocessor};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::binary::{Library, VendorBinary};
use crate::context;
use crate::download::{fetcher_for, HeaderFetcher};
use crate::store::HeaderStore;

/// Preprocessed BASSmix header for one platform and release
pub struct BassMix {
    platform: Option<Platform>,
    version: Version,
    context: PreprocessContext,
    store: HeaderStore,
    fetcher: Box<dyn HeaderFetcher>,
    preprocessor: Box<dyn Preprocessor>,
}

impl BassMix {
    /// Provider for `platform` and `version` using the environment's
    /// configuration and the in-process preprocessor
    pub fn create(platform: Option<Platform>, version: impl IntoVersion) -> Result<Self> {
        let version = version.into_version()?;
        Self::builder().platform(platform).version(version).build()
    }

    /// Provider for the latest release
    pub fn latest(platform: Option<Platform>) -> Result<Self> {
        Self::create(platform, Version::latest())
    }

    pub fn builder() -> BassMixBuilder {
        BassMixBuilder::default()
    }

    pub fn platform(&self) -> Option<Platform> {
        self.platform
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Macro definitions and virtual includes used by `render`
    pub fn context(&self) -> &PreprocessContext {
        &self.context
    }

    pub fn store(&self) -> &HeaderStore {
        &self.store
    }

    /// Where the raw header for this release lives
    pub fn header_path(&self) -> PathBuf {
        self.store.resolve_path(&self.version)
    }

    /// Fetch the raw header once if it is not already in the store
    pub fn ensure_available(&self) -> Result<PathBuf> {
        self.store.ensure_available(&self.version, self.fetcher.as_ref())
    }

    /// Preprocess the raw header. The result ends with exactly one newline.
    ///
    /// Never downloads: a missing header is reported as
    /// [`Error::UnavailableHeader`].
    pub fn render(&self) -> Result<String> {
        let path = self.header_path();
        if !path.is_file() {
            return Err(Error::UnavailableHeader {
                version: self.version.clone(),
                path,
                reason: "header not in store".to_string(),
            });
        }

        debug!(
            "Rendering {:?} with {} preprocessor",
            path,
            self.preprocessor.name()
        );
        let text = self
            .preprocessor
            .process_file(&path, &self.context)
            .map_err(|e| Error::PreprocessingFailed {
                file: path.display().to_string(),
                message: e.to_string(),
            })?;

        let mut header = text.trim_end_matches(['\r', '\n']).to_string();
        header.push('\n');
        Ok(header)
    }

    /// Vendor library build matching this provider. An unspecified platform
    /// means the host platform.
    pub fn vendor_binary(&self, library: Library, bitness: Bitness) -> Option<VendorBinary> {
        let platform = self.platform.or_else(Platform::host)?;
        VendorBinary::locate(library, platform, &self.version, bitness)
    }
}

impl fmt::Debug for BassMix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BassMix")
            .field("platform", &self.platform)
            .field("version", &self.version)
            .field("store", &self.store)
            .field("preprocessor", &self.preprocessor.name())
            .finish()
    }
}

/// Builder for [`BassMix`]
#[derive(Default)]
pub struct BassMixBuilder {
    platform: Option<Platform>,
    version: Option<Version>,
    config: Option<HeadersConfig>,
    store: Option<HeaderStore>,
    fetcher: Option<Box<dyn HeaderFetcher>>,
    preprocessor: Option<Box<dyn Preprocessor>>,
}

impl BassMixBuilder {
    pub fn platform(mut self, platform: Option<Platform>) -> Self {
        self.platform = platform;
        self
    }

    /// Release to render (defaults to the latest)
    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Configuration for the store and fetcher (defaults to
    /// [`HeadersConfig::from_env`])
    pub fn config(mut self, config: HeadersConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use this store instead of the configured one
    pub fn store(mut self, store: HeaderStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Use this fetcher instead of the configured one
    pub fn fetcher(mut self, fetcher: impl HeaderFetcher + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    /// Use this preprocessor instead of the in-process one
    pub fn preprocessor(mut self, preprocessor: impl Preprocessor + 'static) -> Self {
        self.preprocessor = Some(Box::new(preprocessor));
        self
    }

    /// Validate the platform and release, then assemble the provider
    pub fn build(self) -> Result<BassMix> {
        let version = self.version.unwrap_or_default();
        let context = context::build(self.platform, &version)?;

        let config = self.config.unwrap_or_else(HeadersConfig::from_env);
        let store = self
            .store
            .unwrap_or_else(|| HeaderStore::from_config(&config));
        let fetcher = self.fetcher.unwrap_or_else(|| fetcher_for(&config));
        let preprocessor = self.preprocessor.unwrap_or_else(get_preprocessor);

        info!(
            "BassMix {} for {} using store {:?}",
            version,
            self.platform.map_or("any platform", |p| p.name()),
            store.root()
        );

        Ok(BassMix {
            platform: self.platform,
            version,
            context,
            store,
            fetcher,
            preprocessor,
        })
    }
}
