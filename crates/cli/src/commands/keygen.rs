//! Firmware key generation

use anyhow::Result;
use ota_container::{FirmwareKey, write_atomic_private};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct KeyFileReport {
    path: PathBuf,
    fingerprint: String,
}

#[derive(Serialize)]
struct KeyReport<'a> {
    key: &'a str,
    fingerprint: String,
}

/// Execute keygen command
pub async fn execute(output: Option<&Path>, force: bool, json: bool) -> Result<()> {
    let key = FirmwareKey::generate();
    let encoded = key.to_hex();

    let Some(path) = output else {
        let report = KeyReport {
            key: encoded.as_str(),
            fingerprint: key.fingerprint(),
        };
        output::print_report("Firmware key", &report, json)?;
        output::print_warning(
            "The key was printed to the terminal; prefer --output for provisioning",
            json,
        );
        return Ok(());
    };

    if path.exists() && !force {
        return Err(CliError::AlreadyExists(path.to_path_buf()).into());
    }

    let mut content = encoded.as_bytes().to_vec();
    content.push(b'\n');
    let written = write_atomic_private(path, &content).await;
    content.fill(0);
    written.map_err(CliError::from)?;
    info!(path = ?path, fingerprint = %key.fingerprint(), "Key file written");

    let report = KeyFileReport {
        path: path.to_path_buf(),
        fingerprint: key.fingerprint(),
    };
    output::print_report("Firmware key written", &report, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[tokio::test]
    async fn test_keygen_writes_loadable_key() -> TestResult {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("ota.key");

        execute(Some(&path), false, true).await?;
        let key = FirmwareKey::from_file(&path)?;
        assert_eq!(key.fingerprint().len(), 16);
        Ok(())
    }

    #[tokio::test]
    async fn test_keygen_refuses_overwrite() -> TestResult {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("ota.key");
        std::fs::write(&path, b"existing")?;

        let Err(err) = execute(Some(&path), false, true).await else {
            return Err("overwrite without --force must fail".into());
        };
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::AlreadyExists(_))
        ));
        assert_eq!(std::fs::read(&path)?, b"existing");

        execute(Some(&path), true, true).await?;
        FirmwareKey::from_file(&path)?;
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_key_file_is_owner_only() -> TestResult {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("ota.key");

        execute(Some(&path), false, true).await?;
        assert_eq!(std::fs::metadata(&path)?.permissions().mode() & 0o777, 0o600);

        // A world-readable file replaced with --force ends owner-only too.
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644))?;
        execute(Some(&path), true, true).await?;
        assert_eq!(std::fs::metadata(&path)?.permissions().mode() & 0o777, 0o600);
        Ok(())
    }
}
