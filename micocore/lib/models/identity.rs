use std::{cmp::Ordering, fmt};

use getset::Getters;
use semver::Version;
use serde::{Deserialize, Serialize};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The `(short_name, version)` pair that identifies a service or an application.
///
/// The pair is immutable once the entity has been created. Surrogate ids exist for storage but
/// all business logic keys on the identity.
///
/// ## Examples
///
/// ```
/// use micocore::models::Identity;
///
/// let identity = Identity::new("svc-a", "1.0.0");
/// assert_eq!(identity.to_string(), "svc-a@1.0.0");
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Getters,
)]
#[getset(get = "pub with_prefix")]
pub struct Identity {
    /// The short name, shared by every version.
    short_name: String,

    /// The version.
    version: String,
}

/// The direction in which versions are listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionOrder {
    /// Oldest version first.
    #[default]
    Ascending,

    /// Newest version first.
    Descending,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Identity {
    /// Creates a new identity.
    pub fn new(short_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            version: version.into(),
        }
    }

    /// Whether this identity addresses the given pair.
    pub fn matches(&self, short_name: &str, version: &str) -> bool {
        self.short_name == short_name && self.version == version
    }
}

impl VersionOrder {
    /// Orders two versions in this direction.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            VersionOrder::Ascending => compare_versions(a, b),
            VersionOrder::Descending => compare_versions(b, a),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Parses a version string as semver. A leading `v` is accepted, so `v1.2.3` parses.
pub fn parse_version(version: &str) -> Option<Version> {
    let trimmed = version.strip_prefix('v').unwrap_or(version);
    Version::parse(trimmed).ok()
}

/// Compares two version strings.
///
/// Semver versions compare by semver precedence and sort before anything that is not semver.
/// Non-semver versions compare lexically.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_version(a), parse_version(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.short_name, self.version)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_accepts_prefix() {
        assert_eq!(parse_version("v1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(parse_version("1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(parse_version("latest"), None);
    }

    #[test]
    fn test_compare_versions_uses_semver_precedence() {
        assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("v1.0.0", "1.0.1"), Ordering::Less);
        assert_eq!(compare_versions("1.0.0-rc.1", "1.0.0"), Ordering::Less);
    }

    #[test]
    fn test_non_semver_versions_sort_last() {
        let mut versions = vec!["nightly", "2.0.0", "beta", "1.0.0"];
        versions.sort_by(|a, b| compare_versions(a, b));
        assert_eq!(versions, vec!["1.0.0", "2.0.0", "beta", "nightly"]);

        versions.sort_by(|a, b| VersionOrder::Descending.compare(a, b));
        assert_eq!(versions, vec!["nightly", "beta", "2.0.0", "1.0.0"]);
    }
}
