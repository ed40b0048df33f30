//! Pre-shared AES-256 key material
//!
//! The key is supplied at runtime (environment variable or key file) and
//! passed explicitly to [`ContainerCodec`](crate::ContainerCodec). Key bytes
//! are zeroized on drop and never printed; logs identify a key only by its
//! fingerprint.

use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{ContainerError, ContainerResult};

/// AES-256 key length in bytes
pub const KEY_LEN: usize = 32;

/// Environment variable consulted by [`FirmwareKey::from_default_env`]
pub const DEFAULT_KEY_ENV: &str = "OTA_FIRMWARE_KEY";

/// 256-bit symmetric key shared with the device decryptor
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct FirmwareKey {
    bytes: [u8; KEY_LEN],
}

impl FirmwareKey {
    /// Create a key from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Create a key from a slice, which must be exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> ContainerResult<Self> {
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            ContainerError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    /// Parse a key from 64 hex characters
    ///
    /// Surrounding and embedded ASCII whitespace is ignored so keys can be
    /// pasted from multi-line dumps.
    pub fn from_hex(encoded: &str) -> ContainerResult<Self> {
        let compact: Zeroizing<String> = Zeroizing::new(
            encoded
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect(),
        );
        let decoded = Zeroizing::new(hex::decode(compact.as_str())?);
        Self::from_slice(&decoded)
    }

    /// Load a key from a hex-encoded environment variable
    pub fn from_env(var: &str) -> ContainerResult<Self> {
        let value = Zeroizing::new(std::env::var(var).map_err(|e| {
            ContainerError::InvalidKey(format!("environment variable {}: {}", var, e))
        })?);
        Self::from_hex(&value)
    }

    /// Load a key from [`DEFAULT_KEY_ENV`]
    pub fn from_default_env() -> ContainerResult<Self> {
        Self::from_env(DEFAULT_KEY_ENV)
    }

    /// Load a key file holding either 32 raw bytes or 64 hex characters
    pub fn from_file(path: &Path) -> ContainerResult<Self> {
        let content = Zeroizing::new(std::fs::read(path)?);

        if content.len() == KEY_LEN {
            return Self::from_slice(&content);
        }

        let text = std::str::from_utf8(&content).map_err(|_| {
            ContainerError::InvalidKey(format!(
                "key file {:?} is neither 32 raw bytes nor hex text",
                path
            ))
        })?;
        Self::from_hex(text)
    }

    /// Generate a fresh random key from the operating system RNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        let key = Self { bytes };
        bytes.zeroize();
        key
    }

    /// Hex encoding of the key (for provisioning output only)
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.bytes))
    }

    /// Short identifier derived from SHA-256 of the key
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.bytes);
        hex::encode(digest.get(..8).unwrap_or_default())
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for FirmwareKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirmwareKey")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

impl PartialEq for FirmwareKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for FirmwareKey {}
