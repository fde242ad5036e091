//! Vendor library binaries
//!
//! Where the vendor publishes the shared libraries matching a header, per
//! platform and bitness. Archives only contain a bitness variant when the
//! compatibility table says it was shipped.

use bassmix_core::{Bitness, Platform, Version};

const VENDOR_FILES_URL: &str = "https://www.un4seen.com/files";

/// Vendor library packages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Library {
    /// The core BASS library the mixer loads against
    Bass,
    BassMix,
}

impl Library {
    fn stem(&self) -> &'static str {
        match self {
            Library::Bass => "bass",
            Library::BassMix => "bassmix",
        }
    }

    fn windows_filename(&self) -> &'static str {
        match self {
            Library::Bass => "bass.dll",
            Library::BassMix => "bassmix.dll",
        }
    }

    fn linux_filename(&self) -> &'static str {
        match self {
            Library::Bass => "libbass.so",
            Library::BassMix => "libbassmix.so",
        }
    }

    fn darwin_filename(&self) -> &'static str {
        match self {
            Library::Bass => "libbass.dylib",
            Library::BassMix => "libbassmix.dylib",
        }
    }
}

/// Location of one library binary inside a vendor archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorBinary {
    /// Archive URL
    pub url: String,
    /// Path of the library inside the archive
    pub entry: String,
    /// File name of the library on disk
    pub filename: &'static str,
}

impl VendorBinary {
    /// Locate a library build, or `None` if it was never shipped
    pub fn locate(library: Library, platform: Platform, version: &Version, bitness: Bitness) -> Option<Self> {
        if !platform.supported_by_bits(version, bitness) {
            return None;
        }

        let stem = library.stem();
        let compact = version.compact();

        let (url, filename, x64_dir) = match platform {
            Platform::Windows => (
                format!("{}/{}{}.zip", VENDOR_FILES_URL, stem, compact),
                library.windows_filename(),
                true,
            ),
            Platform::Linux => (
                format!("{}/{}{}-linux.zip", VENDOR_FILES_URL, stem, compact),
                library.linux_filename(),
                true,
            ),
            // Universal/single-arch dylib at the archive root
            Platform::Darwin => (
                format!("{}/{}{}-osx.zip", VENDOR_FILES_URL, stem, compact),
                library.darwin_filename(),
                false,
            ),
        };

        let entry = match bitness {
            Bitness::X64 if x64_dir => format!("x64/{}", filename),
            _ => filename.to_string(),
        };

        Some(Self {
            url,
            entry,
            filename,
        })
    }
}
