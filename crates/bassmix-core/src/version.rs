//! Library release versions
//!
//! A [`Version`] is a dotted list of numeric components. Ordering and
//! equality are numeric, so `2.10` sorts after `2.4`, and trailing zero
//! components are insignificant (`2.4 == 2.4.0`).

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::Error;

/// A BASSmix release
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<u32>,
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+(\.\d+)*$").expect("valid version pattern"))
}

impl Version {
    /// Releases with a pinned header in the store, oldest first
    pub const KNOWN: &'static [(u32, u32)] = &[(2, 4)];

    /// Create a `major.minor` version
    pub fn new(major: u32, minor: u32) -> Self {
        Self {
            components: vec![major, minor],
        }
    }

    /// Parse a dotted numeric version such as `2.4` or `2.4.17`
    pub fn parse(text: &str) -> Result<Self, Error> {
        let trimmed = text.trim();
        if !version_pattern().is_match(trimmed) {
            return Err(Error::InvalidFormat(text.to_string()));
        }

        let components = trimmed
            .split('.')
            .map(|part| part.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| Error::InvalidFormat(text.to_string()))?;

        Ok(Self { components })
    }

    /// The newest known release
    pub fn latest() -> Self {
        let (major, minor) = Self::KNOWN[Self::KNOWN.len() - 1];
        Self::new(major, minor)
    }

    /// All known releases, oldest first
    pub fn known() -> Vec<Self> {
        Self::KNOWN
            .iter()
            .map(|&(major, minor)| Self::new(major, minor))
            .collect()
    }

    /// Whether this release is part of the catalog
    pub fn is_known(&self) -> bool {
        Self::known().iter().any(|known| known == self)
    }

    pub fn major(&self) -> u32 {
        self.component(0)
    }

    pub fn minor(&self) -> u32 {
        self.component(1)
    }

    /// Numeric components as written
    pub fn components(&self) -> &[u32] {
        &self.components
    }

    /// Components without a separator, as used in vendor archive names (`2.4` -> `24`)
    pub fn compact(&self) -> String {
        self.canonical().iter().map(|c| c.to_string()).collect()
    }

    /// Value of the vendor `BASSVERSION` macro for this release (`2.4` -> `0x204`)
    pub fn bass_version_code(&self) -> u32 {
        (self.major() << 8) | (self.minor() & 0xff)
    }

    pub fn lt(&self, other: &Version) -> bool {
        self < other
    }

    pub fn gte(&self, other: &Version) -> bool {
        self >= other
    }

    fn component(&self, index: usize) -> u32 {
        self.components.get(index).copied().unwrap_or(0)
    }

    /// Components with trailing zeros removed
    fn significant(&self) -> &[u32] {
        let len = self
            .components
            .iter()
            .rposition(|&c| c != 0)
            .map_or(0, |pos| pos + 1);
        &self.components[..len]
    }

    /// Significant components padded to at least `major.minor`
    fn canonical(&self) -> Vec<u32> {
        let mut components = self.significant().to_vec();
        while components.len() < 2 {
            components.push(0);
        }
        components
    }
}

/// Conversion accepted wherever a version is requested
pub trait IntoVersion {
    fn into_version(self) -> Result<Version, Error>;
}

impl IntoVersion for Version {
    fn into_version(self) -> Result<Version, Error> {
        Ok(self)
    }
}

impl IntoVersion for &Version {
    fn into_version(self) -> Result<Version, Error> {
        Ok(self.clone())
    }
}

impl IntoVersion for &str {
    fn into_version(self) -> Result<Version, Error> {
        Version::parse(self)
    }
}

impl IntoVersion for String {
    fn into_version(self) -> Result<Version, Error> {
        Version::parse(&self)
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::latest()
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Canonical form: trailing zero components dropped, at least `major.minor`
impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.canonical().iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Version::parse(&text).map_err(serde::de::Error::custom)
    }
}
