//! Prelude for ota-manifest

pub use crate::builder::{ManifestBuilder, ManifestTemplate};
pub use crate::cache::ManifestCache;
pub use crate::digest::{ArtifactDigest, compute_sha256_hex};
pub use crate::error::{ManifestError, ManifestResult};
pub use crate::manifest::FirmwareManifest;
