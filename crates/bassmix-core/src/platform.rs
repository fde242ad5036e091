//! Target platforms and the vendor compatibility table
//!
//! BASSmix was never shipped for every platform in every release. The
//! table below records which (platform, bitness) builds exist per version
//! range, taken from the vendor's historical packaging.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::version::Version;

/// Supported target operating systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
    Darwin,
}

/// Pointer width of a vendor binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bitness {
    X86,
    X64,
}

/// One row of the compatibility table: `since <= version < until`
struct Compatibility {
    platform: Platform,
    bitness: Bitness,
    since: Option<(u32, u32)>,
    until: Option<(u32, u32)>,
}

const COMPATIBILITY: &[Compatibility] = &[
    Compatibility {
        platform: Platform::Windows,
        bitness: Bitness::X86,
        since: None,
        until: None,
    },
    Compatibility {
        platform: Platform::Windows,
        bitness: Bitness::X64,
        since: Some((2, 4)),
        until: None,
    },
    Compatibility {
        platform: Platform::Linux,
        bitness: Bitness::X86,
        since: Some((2, 4)),
        until: None,
    },
    Compatibility {
        platform: Platform::Linux,
        bitness: Bitness::X64,
        since: Some((2, 4)),
        until: None,
    },
    // 32-bit only until 2.4, 64-bit only from 2.4 on
    Compatibility {
        platform: Platform::Darwin,
        bitness: Bitness::X86,
        since: None,
        until: Some((2, 4)),
    },
    Compatibility {
        platform: Platform::Darwin,
        bitness: Bitness::X64,
        since: Some((2, 4)),
        until: None,
    },
];

impl Compatibility {
    fn matches(&self, version: &Version) -> bool {
        let after_since = self
            .since
            .map_or(true, |(major, minor)| version.gte(&Version::new(major, minor)));
        let before_until = self
            .until
            .map_or(true, |(major, minor)| version.lt(&Version::new(major, minor)));
        after_since && before_until
    }
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Windows, Platform::Linux, Platform::Darwin];

    /// Upper-case name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Windows => "WINDOWS",
            Platform::Linux => "LINUX",
            Platform::Darwin => "DARWIN",
        }
    }

    /// The platform this crate was compiled for, if it is one of ours
    pub fn host() -> Option<Platform> {
        if cfg!(target_os = "windows") {
            Some(Platform::Windows)
        } else if cfg!(target_os = "linux") {
            Some(Platform::Linux)
        } else if cfg!(target_os = "macos") {
            Some(Platform::Darwin)
        } else {
            None
        }
    }

    /// Whether the vendor shipped any build of `version` for this platform
    pub fn supported_by(&self, version: &Version) -> bool {
        COMPATIBILITY
            .iter()
            .any(|row| row.platform == *self && row.matches(version))
    }

    /// Whether the vendor shipped a `bitness` build of `version` for this platform
    pub fn supported_by_bits(&self, version: &Version, bitness: Bitness) -> bool {
        COMPATIBILITY
            .iter()
            .any(|row| row.platform == *self && row.bitness == bitness && row.matches(version))
    }

    /// Bitness variants shipped for `version`
    pub fn bitnesses(&self, version: &Version) -> Vec<Bitness> {
        COMPATIBILITY
            .iter()
            .filter(|row| row.platform == *self && row.matches(version))
            .map(|row| row.bitness)
            .collect()
    }
}

/// Compatibility lookup where "no platform" always passes
pub fn is_supported(platform: Option<Platform>, version: &Version) -> bool {
    platform.map_or(true, |p| p.supported_by(version))
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "windows" | "win32" | "win" => Ok(Platform::Windows),
            "linux" => Ok(Platform::Linux),
            "darwin" | "macos" | "osx" => Ok(Platform::Darwin),
            _ => Err(Error::UnknownPlatform(s.to_string())),
        }
    }
}

impl Bitness {
    pub fn host() -> Bitness {
        if cfg!(target_pointer_width = "64") {
            Bitness::X64
        } else {
            Bitness::X86
        }
    }
}

impl fmt::Display for Bitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bitness::X86 => f.write_str("x86"),
            Bitness::X64 => f.write_str("x64"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    #[test]
    fn test_windows_supports_everything() {
        for version in Version::known() {
            assert!(Platform::Windows.supported_by(&version));
        }
        assert!(!Platform::Windows.supported_by_bits(&v("2.3"), Bitness::X64));
        assert!(Platform::Windows.supported_by_bits(&v("2.4"), Bitness::X64));
    }

    #[test]
    fn test_linux_starts_at_2_4() {
        assert!(!Platform::Linux.supported_by(&v("2.3")));
        assert!(Platform::Linux.supported_by(&v("2.4")));
        assert!(Platform::Linux.supported_by(&v("2.10")));
    }

    #[test]
    fn test_darwin_bitness_split() {
        assert!(Platform::Darwin.supported_by_bits(&v("2.3"), Bitness::X86));
        assert!(!Platform::Darwin.supported_by_bits(&v("2.3"), Bitness::X64));
        assert!(Platform::Darwin.supported_by_bits(&v("2.4"), Bitness::X64));
        assert!(!Platform::Darwin.supported_by_bits(&v("2.4"), Bitness::X86));
        assert_eq!(Platform::Darwin.bitnesses(&v("2.4")), vec![Bitness::X64]);
    }

    #[test]
    fn test_unspecified_platform_always_passes() {
        assert!(is_supported(None, &v("0.1")));
        assert!(!is_supported(Some(Platform::Linux), &v("2.2")));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("Windows".parse::<Platform>().unwrap(), Platform::Windows);
        assert_eq!("osx".parse::<Platform>().unwrap(), Platform::Darwin);
        assert_eq!("LINUX".parse::<Platform>().unwrap(), Platform::Linux);
        assert!(matches!(
            "beos".parse::<Platform>(),
            Err(Error::UnknownPlatform(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Platform::Darwin.to_string(), "DARWIN");
        assert_eq!(Bitness::X64.to_string(), "x64");
    }
}
