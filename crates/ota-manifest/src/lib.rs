//! Firmware manifests for OTA distribution
//!
//! A manifest binds release metadata (version, eligibility window, download
//! URL) to the exact bytes of one encrypted container through its SHA-256
//! digest and length. The distribution endpoint builds a fresh manifest per
//! request so it can never advertise a digest for bytes it no longer serves.
//!
//! - [`manifest`]: the JSON record and device-side checks
//! - [`builder`]: validated templates and manifest construction
//! - [`digest`]: SHA-256 helpers
//! - [`cache`]: digest cache keyed on modification time and length
//! - [`error`]: error types
//!
//! ```
//! use ota_manifest::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let template = ManifestTemplate::new(
//!     "2.0.0",
//!     "1.0.0",
//!     "https://192.168.1.20:8443/firmware.bin",
//!     "Local OTA update",
//! )?;
//! let manifest = ManifestBuilder::new(template).build_from_bytes(b"container bytes");
//!
//! assert_eq!(manifest.size, 15);
//! manifest.verify_artifact(b"container bytes")?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod builder;
pub mod cache;
pub mod digest;
pub mod error;
pub mod manifest;
pub mod prelude;

pub use builder::{ManifestBuilder, ManifestTemplate};
pub use cache::{ArtifactFingerprint, CacheStats, ManifestCache};
pub use digest::{ArtifactDigest, ZERO_DIGEST, compute_sha256_hex, digest_bytes, digest_file};
pub use error::{ManifestError, ManifestResult};
pub use manifest::FirmwareManifest;
