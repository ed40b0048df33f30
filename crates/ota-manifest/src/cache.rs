//! Staleness-checked digest cache
//!
//! Hashing a large container on every manifest request is wasteful, but the
//! manifest must never describe bytes other than the ones currently on disk.
//! Entries are keyed by path and remembered together with the artifact's
//! modification time and length; any change to either forces a rehash.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tracing::{debug, trace};

use crate::digest::{ArtifactDigest, digest_file};
use crate::error::{ManifestError, ManifestResult};

/// File attributes that invalidate a cached digest when they change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactFingerprint {
    /// Last modification time, when the platform reports one
    pub modified: Option<SystemTime>,
    /// Length in bytes
    pub len: u64,
}

impl ArtifactFingerprint {
    /// Fingerprint of the artifact at `path`
    ///
    /// # Errors
    ///
    /// [`ManifestError::ArtifactNotFound`] if the path is missing or is not
    /// a regular file.
    pub async fn of(path: &Path) -> ManifestResult<Self> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManifestError::ArtifactNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            return Err(ManifestError::ArtifactNotFound(path.to_path_buf()));
        }
        Ok(Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        })
    }
}

#[derive(Debug, Clone)]
struct CachedDigest {
    fingerprint: ArtifactFingerprint,
    digest: ArtifactDigest,
}

/// Cache hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that rehashed the artifact
    pub misses: u64,
}

/// Digest cache shared by request handlers
#[derive(Debug, Default)]
pub struct ManifestCache {
    entries: RwLock<HashMap<PathBuf, CachedDigest>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ManifestCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Digest of the artifact at `path`, rehashing only when stale
    ///
    /// A missing artifact also drops any cached entry for it.
    ///
    /// # Errors
    ///
    /// See [`digest_file`].
    pub async fn digest(&self, path: &Path) -> ManifestResult<ArtifactDigest> {
        let fingerprint = match ArtifactFingerprint::of(path).await {
            Ok(fp) => fp,
            Err(e) => {
                if e.is_not_found() {
                    self.invalidate(path);
                }
                return Err(e);
            }
        };

        let cached = self
            .entries
            .read()
            .get(path)
            .filter(|entry| entry.fingerprint == fingerprint)
            .map(|entry| entry.digest.clone());

        if let Some(digest) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(path = ?path, "Digest cache hit");
            return Ok(digest);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(path = ?path, len = fingerprint.len, "Digest cache miss, hashing artifact");
        let digest = digest_file(path).await?;

        // The file may have changed while it was being hashed; only keep the
        // entry if the fingerprint still matches what was read.
        if ArtifactFingerprint::of(path).await.ok() == Some(fingerprint)
            && digest.size == fingerprint.len
        {
            self.entries.write().insert(
                path.to_path_buf(),
                CachedDigest {
                    fingerprint,
                    digest: digest.clone(),
                },
            );
        }

        Ok(digest)
    }

    /// Forget the entry for `path`
    pub fn invalidate(&self, path: &Path) {
        self.entries.write().remove(path);
    }

    /// Forget every entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Hit/miss counters since creation
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
