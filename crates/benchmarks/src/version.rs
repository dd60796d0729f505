//! Build-under-test version strings.
//!
//! Every stored result carries a version of the form
//! `{semantic_version}+{short_sha}`, where `short_sha` is the first seven
//! characters of the commit that was benchmarked. That suffix is the join key
//! used to decide whether a commit already has results.

use crate::SchemaError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of commit characters kept in a version string.
pub const SHORT_SHA_LEN: usize = 7;

static SEMVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?$").expect("valid semver regex")
});

static DUT_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?\+[0-9a-f]{7}$").expect("valid version regex")
});

/// Return the seven-character prefix of a commit SHA.
///
/// The commit must be at least seven hexadecimal characters long. Upper-case
/// hex is accepted and folded to lower case.
pub fn short_sha(commit: &str) -> Result<String, SchemaError> {
    let commit = commit.trim();
    if commit.len() < SHORT_SHA_LEN || !commit.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SchemaError::InvalidCommit(commit.to_string()));
    }
    Ok(commit[..SHORT_SHA_LEN].to_ascii_lowercase())
}

/// A validated `semver+short_sha` version string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DutVersion(String);

impl DutVersion {
    /// Assemble a version from a semantic version and a commit SHA.
    ///
    /// A leading `v` on the semantic version is dropped.
    pub fn new(semver: &str, commit: &str) -> Result<Self, SchemaError> {
        let semver = semver.trim();
        let semver = semver.strip_prefix('v').unwrap_or(semver);
        if !SEMVER.is_match(semver) {
            return Err(SchemaError::InvalidVersion(semver.to_string()));
        }
        Ok(Self(format!("{}+{}", semver, short_sha(commit)?)))
    }

    /// Validate an already assembled version string.
    pub fn parse(version: &str) -> Result<Self, SchemaError> {
        let version = version.trim();
        if DUT_VERSION.is_match(version) {
            Ok(Self(version.to_string()))
        } else {
            Err(SchemaError::InvalidVersion(version.to_string()))
        }
    }

    /// The semantic-version part.
    pub fn semver(&self) -> &str {
        self.0.split_once('+').map_or(self.0.as_str(), |(semver, _)| semver)
    }

    /// The seven-character commit suffix.
    pub fn short_sha(&self) -> &str {
        self.0.split_once('+').map_or("", |(_, sha)| sha)
    }

    /// The full `semver+short_sha` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DutVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DutVersion {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DutVersion> for String {
    fn from(version: DutVersion) -> Self {
        version.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "3f9c2d1e8b7a6c5d4e3f2a1b0c9d8e7f6a5b4c3d";

    #[test]
    fn short_sha_is_first_seven_chars() {
        assert_eq!(short_sha(SHA).unwrap(), "3f9c2d1");
        assert_eq!(short_sha("ABCDEF0123").unwrap(), "abcdef0");
    }

    #[test]
    fn short_sha_rejects_short_or_non_hex() {
        assert!(matches!(short_sha("abc12"), Err(SchemaError::InvalidCommit(_))));
        assert!(matches!(short_sha("not-a-sha-at-all"), Err(SchemaError::InvalidCommit(_))));
    }

    #[test]
    fn version_is_semver_plus_short_sha() {
        let version = DutVersion::new("0.21.1", SHA).unwrap();
        assert_eq!(version.as_str(), "0.21.1+3f9c2d1");
        assert_eq!(version.semver(), "0.21.1");
        assert_eq!(version.short_sha(), "3f9c2d1");

        let prefixed = DutVersion::new("v0.22.0-beta.1", SHA).unwrap();
        assert_eq!(prefixed.as_str(), "0.22.0-beta.1+3f9c2d1");
    }

    #[test]
    fn parse_rejects_malformed_versions() {
        assert!(DutVersion::parse("0.21.1+3f9c2d1").is_ok());
        for bad in ["0.21.1", "0.21+3f9c2d1", "0.21.1+3f9c2d", "0.21.1+3F9C2D1", "latest"] {
            assert!(DutVersion::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn deserialization_validates() {
        let ok: DutVersion = serde_json::from_str("\"1.0.0+abcdef0\"").unwrap();
        assert_eq!(ok.short_sha(), "abcdef0");
        assert!(serde_json::from_str::<DutVersion>("\"1.0.0\"").is_err());
    }
}
