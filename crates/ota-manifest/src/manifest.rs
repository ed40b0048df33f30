//! The manifest record published next to a firmware container

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::digest::{ArtifactDigest, compute_sha256_hex};
use crate::error::{ManifestError, ManifestResult};

/// Metadata bound to one served container
///
/// The field set and names are the external JSON contract consumed by the
/// device updater. `sha256` and `size` describe the container bytes as
/// served, not the plaintext firmware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareManifest {
    /// Release version
    pub version: Version,
    /// Absolute URL of the container
    pub firmware_url: Url,
    /// Lowercase hex SHA-256 of the container
    pub sha256: String,
    /// When this manifest was produced
    pub build_date: DateTime<Utc>,
    /// Free-text release description
    pub description: String,
    /// Lowest device version eligible for this update
    pub min_version: Version,
    /// Container length in bytes
    pub size: u64,
}

impl FirmwareManifest {
    /// Manifest describing a missing artifact: zero digest and size 0
    pub fn placeholder(
        version: Version,
        min_version: Version,
        firmware_url: Url,
        description: impl Into<String>,
    ) -> Self {
        let ArtifactDigest { sha256, size } = ArtifactDigest::zero();
        Self {
            version,
            firmware_url,
            sha256,
            build_date: Utc::now(),
            description: description.into(),
            min_version,
            size,
        }
    }

    /// Whether this manifest describes an actual artifact
    pub fn has_artifact(&self) -> bool {
        self.size > 0 || self.sha256 != ArtifactDigest::zero().sha256
    }

    /// Check downloaded container bytes against the manifest
    ///
    /// Size is compared first since it is cheap; the digest comparison is
    /// case-insensitive on the published value.
    ///
    /// # Errors
    ///
    /// [`ManifestError::IntegrityMismatch`] naming the first field that differs.
    pub fn verify_artifact(&self, bytes: &[u8]) -> ManifestResult<()> {
        let actual_size = bytes.len() as u64;
        if actual_size != self.size {
            return Err(ManifestError::IntegrityMismatch {
                field: "size",
                expected: self.size.to_string(),
                actual: actual_size.to_string(),
            });
        }

        let actual = compute_sha256_hex(bytes);
        if !actual.eq_ignore_ascii_case(&self.sha256) {
            return Err(ManifestError::IntegrityMismatch {
                field: "sha256",
                expected: self.sha256.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// Whether a device running `device_version` should take this update
    pub fn is_applicable_to(&self, device_version: &Version) -> bool {
        *device_version >= self.min_version && *device_version < self.version
    }

    /// Pretty-printed JSON
    pub fn to_json_pretty(&self) -> ManifestResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a manifest from JSON
    pub fn from_json(json: &str) -> ManifestResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
