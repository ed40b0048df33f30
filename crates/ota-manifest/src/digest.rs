//! SHA-256 digests of finished artifacts

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::{ManifestError, ManifestResult};

/// Digest reported when no artifact exists
pub const ZERO_DIGEST: &str = "0000000000000000000000000000000000000000000000000000000000000000";

const READ_CHUNK: usize = 64 * 1024;

/// SHA-256 and length of one artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDigest {
    /// Lowercase hex SHA-256
    pub sha256: String,
    /// Length in bytes
    pub size: u64,
}

impl ArtifactDigest {
    /// Digest of the empty placeholder
    pub fn zero() -> Self {
        Self {
            sha256: ZERO_DIGEST.to_string(),
            size: 0,
        }
    }
}

/// Compute the lowercase hex SHA-256 of `data`
pub fn compute_sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Digest an in-memory artifact
pub fn digest_bytes(data: &[u8]) -> ArtifactDigest {
    ArtifactDigest {
        sha256: compute_sha256_hex(data),
        size: data.len() as u64,
    }
}

/// Digest an artifact on disk without loading it whole
///
/// # Errors
///
/// [`ManifestError::ArtifactNotFound`] if `path` does not exist or is not a
/// regular file; [`ManifestError::Io`] for read failures.
pub async fn digest_file(path: &Path) -> ManifestResult<ArtifactDigest> {
    let mut file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ManifestError::ArtifactNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    if !file.metadata().await?.is_file() {
        return Err(ManifestError::ArtifactNotFound(path.to_path_buf()));
    }

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];
    let mut size = 0u64;
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(buf.get(..n).unwrap_or_default());
        size = size.saturating_add(n as u64);
    }

    let digest = ArtifactDigest {
        sha256: hex::encode(hasher.finalize()),
        size,
    };
    debug!(path = ?path, size = digest.size, sha256 = %digest.sha256, "Digested artifact");
    Ok(digest)
}
