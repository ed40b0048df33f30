//! Artifact storage with atomic replacement
//!
//! Containers and manifests are never written in place. Content goes to a
//! temporary sibling first and is renamed over the target, so a reader of
//! the final path sees either the previous file or the complete new one.

use rand::RngCore;
use rand::rngs::OsRng;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::ContainerResult;

/// Permission bits for files written by [`write_atomic_private`]
#[cfg(unix)]
pub const PRIVATE_FILE_MODE: u32 = 0o600;

/// Fresh temporary sibling path for one write of `path`
///
/// Every call returns a distinct name, so concurrent writers of the same
/// target never share a temporary file.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut suffix = [0u8; 8];
    OsRng.fill_bytes(&mut suffix);

    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.{}.tmp", std::process::id(), hex::encode(suffix)));
    path.with_file_name(name)
}

/// Write `content` to `path` atomically
///
/// # Error Recovery
///
/// 1. Write and fsync a temporary sibling file
/// 2. Rename it over the target
/// 3. On any failure the temporary is removed and the target is untouched
pub async fn write_atomic(path: &Path, content: &[u8]) -> ContainerResult<()> {
    write_atomic_with(path, content, false).await
}

/// Write `content` to `path` atomically, readable by the owner only
///
/// On unix the temporary file is created with mode `0600`, so the content
/// is never visible under wider permissions, not even before the rename.
pub async fn write_atomic_private(path: &Path, content: &[u8]) -> ContainerResult<()> {
    write_atomic_with(path, content, true).await
}

async fn write_atomic_with(path: &Path, content: &[u8], private: bool) -> ContainerResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        async_fs::create_dir_all(parent).await?;
    }

    let temp_path = temp_path_for(path);
    debug!(path = ?path, temp = ?temp_path, private, "Writing artifact atomically");

    let result = write_and_rename(&temp_path, path, content, private).await;
    if let Err(ref e) = result {
        warn!(path = ?path, error = %e, "Atomic write failed, removing temporary file");
        if let Err(cleanup) = async_fs::remove_file(&temp_path).await
            && cleanup.kind() != std::io::ErrorKind::NotFound
        {
            warn!(temp = ?temp_path, error = %cleanup, "Failed to remove temporary file");
        }
    } else {
        info!(path = ?path, bytes = content.len(), "Artifact written");
    }

    result
}

async fn write_and_rename(
    temp_path: &Path,
    path: &Path,
    content: &[u8],
    private: bool,
) -> ContainerResult<()> {
    let mut options = async_fs::OpenOptions::new();
    options.write(true).create_new(true);
    if private {
        restrict_to_owner(&mut options);
    }

    let mut file = options.open(temp_path).await?;
    file.write_all(content).await?;
    file.sync_all().await?;
    drop(file);

    async_fs::rename(temp_path, path).await?;
    Ok(())
}

#[cfg(unix)]
fn restrict_to_owner(options: &mut async_fs::OpenOptions) {
    options.mode(PRIVATE_FILE_MODE);
}

#[cfg(not(unix))]
fn restrict_to_owner(_options: &mut async_fs::OpenOptions) {
    debug!("Owner-only file mode is not applied on this platform");
}

/// Read a complete artifact from `path`
pub async fn read_artifact(path: &Path) -> ContainerResult<Vec<u8>> {
    debug!(path = ?path, "Reading artifact");
    Ok(async_fs::read(path).await?)
}
