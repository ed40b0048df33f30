//! Manifest construction from a finished artifact

use chrono::{DateTime, Utc};
use semver::Version;
use std::path::Path;
use tracing::{debug, info};
use url::Url;

use crate::cache::ManifestCache;
use crate::digest::{ArtifactDigest, digest_bytes, digest_file};
use crate::error::{ManifestError, ManifestResult};
use crate::manifest::FirmwareManifest;

/// Release fields that do not depend on the artifact bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestTemplate {
    version: Version,
    min_version: Version,
    firmware_url: Url,
    description: String,
}

impl ManifestTemplate {
    /// Validate and build a template from string inputs
    ///
    /// # Errors
    ///
    /// - [`ManifestError::InvalidVersion`] if either version is not semver
    /// - [`ManifestError::VersionOrder`] if `min_version` is newer than `version`
    /// - [`ManifestError::InvalidUrl`] if `firmware_url` is not absolute
    pub fn new(
        version: &str,
        min_version: &str,
        firmware_url: &str,
        description: impl Into<String>,
    ) -> ManifestResult<Self> {
        let version = parse_version(version)?;
        let min_version = parse_version(min_version)?;
        let firmware_url = Url::parse(firmware_url).map_err(|e| ManifestError::InvalidUrl {
            value: firmware_url.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_parts(version, min_version, firmware_url, description)
    }

    /// Build a template from already parsed parts
    ///
    /// # Errors
    ///
    /// See [`ManifestTemplate::new`].
    pub fn from_parts(
        version: Version,
        min_version: Version,
        firmware_url: Url,
        description: impl Into<String>,
    ) -> ManifestResult<Self> {
        if min_version > version {
            return Err(ManifestError::VersionOrder {
                version,
                min_version,
            });
        }
        if firmware_url.cannot_be_a_base() || firmware_url.host().is_none() {
            return Err(ManifestError::InvalidUrl {
                value: firmware_url.to_string(),
                reason: "URL must be absolute with a host".to_string(),
            });
        }

        Ok(Self {
            version,
            min_version,
            firmware_url,
            description: description.into(),
        })
    }

    /// Release version
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Lowest eligible device version
    pub fn min_version(&self) -> &Version {
        &self.min_version
    }

    /// URL the container is served from
    pub fn firmware_url(&self) -> &Url {
        &self.firmware_url
    }

    /// Release description
    pub fn description(&self) -> &str {
        &self.description
    }
}

fn parse_version(value: &str) -> ManifestResult<Version> {
    Version::parse(value.trim()).map_err(|e| ManifestError::InvalidVersion {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Produces manifests for artifacts described by one template
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    template: ManifestTemplate,
}

impl ManifestBuilder {
    /// Create a builder for `template`
    pub fn new(template: ManifestTemplate) -> Self {
        Self { template }
    }

    /// Template in use
    pub fn template(&self) -> &ManifestTemplate {
        &self.template
    }

    /// Manifest for in-memory container bytes, stamped now
    pub fn build_from_bytes(&self, bytes: &[u8]) -> FirmwareManifest {
        self.build_from_digest(digest_bytes(bytes), Utc::now())
    }

    /// Manifest for a precomputed digest with an explicit build date
    pub fn build_from_digest(
        &self,
        digest: ArtifactDigest,
        build_date: DateTime<Utc>,
    ) -> FirmwareManifest {
        FirmwareManifest {
            version: self.template.version.clone(),
            firmware_url: self.template.firmware_url.clone(),
            sha256: digest.sha256,
            build_date,
            description: self.template.description.clone(),
            min_version: self.template.min_version.clone(),
            size: digest.size,
        }
    }

    /// Manifest for the container stored at `path`
    ///
    /// # Errors
    ///
    /// [`ManifestError::ArtifactNotFound`] when there is no artifact yet;
    /// [`ManifestError::Io`] when it cannot be read.
    pub async fn build_from_path(&self, path: &Path) -> ManifestResult<FirmwareManifest> {
        debug!(path = ?path, "Building manifest from artifact");
        let digest = digest_file(path).await?;
        let manifest = self.build_from_digest(digest, Utc::now());
        info!(
            version = %manifest.version,
            size = manifest.size,
            sha256 = %manifest.sha256,
            "Built firmware manifest"
        );
        Ok(manifest)
    }

    /// Like [`ManifestBuilder::build_from_path`] but reuses a cached digest
    /// while the artifact's modification time and length are unchanged
    ///
    /// # Errors
    ///
    /// See [`ManifestBuilder::build_from_path`].
    pub async fn build_cached(
        &self,
        cache: &ManifestCache,
        path: &Path,
    ) -> ManifestResult<FirmwareManifest> {
        let digest = cache.digest(path).await?;
        Ok(self.build_from_digest(digest, Utc::now()))
    }

    /// Zero-digest manifest used when no artifact exists
    pub fn placeholder(&self) -> FirmwareManifest {
        FirmwareManifest::placeholder(
            self.template.version.clone(),
            self.template.min_version.clone(),
            self.template.firmware_url.clone(),
            self.template.description.clone(),
        )
    }
}
