//! Container encrypt, decrypt and inspect commands

use anyhow::Result;
use ota_container::{ContainerCodec, ContainerScheme, FirmwareContainer, read_artifact, write_atomic};
use ota_manifest::compute_sha256_hex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::commands::{ContainerCommands, KeySource, ensure_exists};
use crate::error::CliError;
use crate::output;

/// Execute container command
pub async fn execute(cmd: &ContainerCommands, json: bool) -> Result<()> {
    match cmd {
        ContainerCommands::Encrypt {
            input,
            output,
            scheme,
            key,
        } => encrypt(input, output, *scheme, key, json).await,
        ContainerCommands::Decrypt {
            input,
            output,
            scheme,
            key,
        } => decrypt(input, output, *scheme, key, json).await,
        ContainerCommands::Inspect { input, scheme } => inspect(input, *scheme, json).await,
    }
}

/// Result of `otactl encrypt`
#[derive(Debug, Serialize)]
pub struct EncryptReport {
    pub scheme: ContainerScheme,
    pub input: PathBuf,
    pub output: PathBuf,
    pub plaintext_size: usize,
    pub container_size: usize,
    pub sha256: String,
    pub key_fingerprint: String,
}

/// Result of `otactl decrypt`
#[derive(Debug, Serialize)]
pub struct DecryptReport {
    pub scheme: ContainerScheme,
    pub input: PathBuf,
    pub output: PathBuf,
    pub container_size: usize,
    pub plaintext_size: usize,
    pub key_fingerprint: String,
}

/// Wire fields of a container, as reported by `otactl inspect`
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct InspectReport {
    pub scheme: ContainerScheme,
    pub container_size: usize,
    /// Declared plaintext length (CBC only)
    pub size_header: Option<u32>,
    pub iv: String,
    pub nonce: String,
    /// Initial counter value (CTR only)
    pub initial_counter: Option<u64>,
    pub ciphertext_size: usize,
    pub sha256: String,
}

impl InspectReport {
    /// Describe `bytes` as a container of `scheme`
    pub fn from_bytes(scheme: ContainerScheme, bytes: &[u8]) -> Result<Self, CliError> {
        let container = FirmwareContainer::parse(scheme, bytes)?;
        Ok(Self {
            scheme,
            container_size: bytes.len(),
            size_header: container.size_header(),
            iv: hex::encode(container.iv().as_bytes()),
            nonce: hex::encode(container.iv().nonce(scheme)),
            initial_counter: container.iv().counter(scheme),
            ciphertext_size: container.ciphertext().len(),
            sha256: compute_sha256_hex(bytes),
        })
    }
}

async fn read_input(path: &Path) -> Result<Vec<u8>, CliError> {
    ensure_exists(path)?;
    Ok(read_artifact(path).await?)
}

async fn encrypt(
    input: &Path,
    output: &Path,
    scheme: ContainerScheme,
    key: &KeySource,
    json: bool,
) -> Result<()> {
    let codec = ContainerCodec::new(scheme, key.load()?);
    let image = read_input(input).await?;
    debug!(input = ?input, size = image.len(), %scheme, "Encrypting firmware image");

    let container = codec.encode_to_vec(&image).map_err(CliError::from)?;
    write_atomic(output, &container)
        .await
        .map_err(CliError::from)?;
    info!(output = ?output, size = container.len(), "Container written");

    let report = EncryptReport {
        scheme,
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        plaintext_size: image.len(),
        container_size: container.len(),
        sha256: compute_sha256_hex(&container),
        key_fingerprint: codec.key_fingerprint(),
    };
    output::print_report("Container created", &report, json)?;
    Ok(())
}

async fn decrypt(
    input: &Path,
    output: &Path,
    scheme: ContainerScheme,
    key: &KeySource,
    json: bool,
) -> Result<()> {
    let codec = ContainerCodec::new(scheme, key.load()?);
    let container = read_input(input).await?;
    debug!(input = ?input, size = container.len(), %scheme, "Decrypting container");

    // A wrong key or scheme on a CTR container still "succeeds" with garbage.
    let image = codec.decode(&container).map_err(CliError::from)?;
    write_atomic(output, &image).await.map_err(CliError::from)?;

    let report = DecryptReport {
        scheme,
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        container_size: container.len(),
        plaintext_size: image.len(),
        key_fingerprint: codec.key_fingerprint(),
    };
    output::print_report("Container decrypted", &report, json)?;
    if scheme.is_counter_mode() {
        output::print_warning(
            "Counter-mode containers carry no integrity check; verify the image digest before flashing",
            json,
        );
    }
    Ok(())
}

async fn inspect(input: &Path, scheme: ContainerScheme, json: bool) -> Result<()> {
    let bytes = read_input(input).await?;
    let report = InspectReport::from_bytes(scheme, &bytes)?;
    output::print_report("Container layout", &report, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ota_container::{FirmwareKey, IvMaterial};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_inspect_cbc_fields() -> TestResult {
        let codec = ContainerCodec::new(ContainerScheme::CbcSizePrefixed, FirmwareKey::generate());
        let iv = IvMaterial::from_bytes([0x11; 16]);
        let container = codec.encode_with_iv(&[0xAA; 17], iv)?.to_bytes();

        let report = InspectReport::from_bytes(ContainerScheme::CbcSizePrefixed, &container)?;
        assert_eq!(report.container_size, 52);
        assert_eq!(report.size_header, Some(17));
        assert_eq!(report.iv, "11".repeat(16));
        assert_eq!(report.nonce, report.iv);
        assert_eq!(report.initial_counter, None);
        assert_eq!(report.ciphertext_size, 32);
        Ok(())
    }

    #[test]
    fn test_inspect_ctr_fields() -> TestResult {
        let mut iv = [0u8; 16];
        if let Some(counter) = iv.get_mut(12..) {
            counter.copy_from_slice(&1u32.to_be_bytes());
        }
        let codec = ContainerCodec::new(ContainerScheme::CtrNonce96, FirmwareKey::generate());
        let container = codec
            .encode_with_iv(&[0x55; 40], IvMaterial::from_bytes(iv))?
            .to_bytes();

        let report = InspectReport::from_bytes(ContainerScheme::CtrNonce96, &container)?;
        assert_eq!(report.size_header, None);
        assert_eq!(report.nonce, "00".repeat(12));
        assert_eq!(report.initial_counter, Some(1));
        assert_eq!(report.ciphertext_size, 40);
        Ok(())
    }

    #[test]
    fn test_inspect_short_input() {
        let result = InspectReport::from_bytes(ContainerScheme::CbcSizePrefixed, &[0u8; 10]);
        assert!(matches!(result, Err(CliError::InvalidContainer(_))));
    }
}
