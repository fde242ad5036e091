//! BassMix Headers
//!
//! Version-pinned BASSmix C headers, preprocessed into a single declaration
//! string that an FFI layer can bind against.
//!
//! ## Modules
//!
//! - `store` - On-disk header cache keyed by release
//! - `download` - Vendor archive download and extraction
//! - `context` - Platform macros and `bass.h` stand-in
//! - `provider` - [`BassMix`], the public entry point
//! - `binary` - Vendor library archive locations
//! - `inspect` - tree-sitter summary of rendered headers
//!
//! ```no_run
//! use bassmix_headers::{BassMix, Platform};
//!
//! let provider = BassMix::create(Some(Platform::Linux), "2.4")?;
//! provider.ensure_available()?;
//! let header = provider.render()?;
//! # Ok::<(), bassmix_headers::Error>(())
//! ```

pub mod binary;
pub mod context;
pub mod download;
pub mod inspect;
pub mod provider;
pub mod store;

pub use bassmix_core::{Bitness, Error, HeadersConfig, IntoVersion, Platform, Result, Version};
pub use binary::{Library, VendorBinary};
pub use download::{extract_entry, fetcher_for, DownloadError, HeaderFetcher, HttpFetcher, NoFetch};
pub use inspect::HeaderSummary;
pub use provider::{BassMix, BassMixBuilder};
pub use store::HeaderStore;
