//! Error types for manifest operations

use std::path::PathBuf;
use thiserror::Error;

/// Manifest builder and verification errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Version string is not valid semver
    #[error("Invalid version '{value}': {reason}")]
    InvalidVersion {
        /// Offending input
        value: String,
        /// Parser message
        reason: String,
    },

    /// Minimum eligible version is newer than the release version
    #[error("Minimum version {min_version} is newer than release version {version}")]
    VersionOrder {
        /// Release version
        version: semver::Version,
        /// Minimum eligible device version
        min_version: semver::Version,
    },

    /// Firmware URL is not an absolute URL
    #[error("Invalid firmware URL '{value}': {reason}")]
    InvalidUrl {
        /// Offending input
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// Artifact does not exist (or is not a regular file)
    #[error("Firmware artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    /// Downloaded bytes disagree with the manifest
    #[error("Integrity mismatch on {field}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        /// `size` or `sha256`
        field: &'static str,
        /// Value published in the manifest
        expected: String,
        /// Value computed from the artifact
        actual: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ManifestError {
    /// Whether the failure means "no artifact to describe"
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ArtifactNotFound(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Result type alias for manifest operations
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(ManifestError::ArtifactNotFound(PathBuf::from("firmware.bin")).is_not_found());
        assert!(
            ManifestError::Io(std::io::Error::from(std::io::ErrorKind::NotFound)).is_not_found()
        );
        assert!(
            !ManifestError::Io(std::io::Error::from(std::io::ErrorKind::PermissionDenied))
                .is_not_found()
        );
    }

    #[test]
    fn test_display_includes_path() {
        let err = ManifestError::ArtifactNotFound(PathBuf::from("/srv/ota/firmware.bin"));
        assert!(err.to_string().contains("/srv/ota/firmware.bin"));
    }
}
