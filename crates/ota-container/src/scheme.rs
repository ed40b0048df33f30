//! Container scheme selection and per-scheme wire layout
//!
//! The three schemes share a 16-byte IV field but are mutually incompatible.
//! Nothing in the container bytes identifies the scheme, so it is always
//! supplied by configuration and never guessed from the input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ContainerError;

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

/// Length of the IV field for every scheme
pub const IV_LEN: usize = 16;

/// Length of the little-endian size header used by the block-mode scheme
pub const SIZE_HEADER_LEN: usize = 4;

/// Encrypted firmware container scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContainerScheme {
    /// Scheme A: `len (u32 LE) || IV || AES-256-CBC(PKCS#7(plaintext))`
    CbcSizePrefixed,
    /// Scheme B: `nonce (12) || counter (u32 BE, starts at 1) || AES-256-CTR(plaintext)`
    CtrNonce96,
    /// Scheme C: `nonce (8) || counter (u64 LE) || AES-256-CTR(plaintext)`
    ///
    /// The keystream counter block is `nonce || counter` with the counter
    /// rendered big-endian. Device decryptors must byte-reverse the last 8
    /// IV bytes before loading them into a CTR state; feeding the stored IV
    /// in unchanged does not interoperate.
    CtrNonce64,
}

impl ContainerScheme {
    /// All schemes, in A/B/C order
    pub const ALL: [ContainerScheme; 3] = [
        ContainerScheme::CbcSizePrefixed,
        ContainerScheme::CtrNonce96,
        ContainerScheme::CtrNonce64,
    ];

    /// Canonical configuration name
    pub fn name(self) -> &'static str {
        match self {
            ContainerScheme::CbcSizePrefixed => "cbc-size-prefixed",
            ContainerScheme::CtrNonce96 => "ctr-nonce96",
            ContainerScheme::CtrNonce64 => "ctr-nonce64",
        }
    }

    /// Length of the header preceding the IV
    pub fn header_len(self) -> usize {
        match self {
            ContainerScheme::CbcSizePrefixed => SIZE_HEADER_LEN,
            ContainerScheme::CtrNonce96 | ContainerScheme::CtrNonce64 => 0,
        }
    }

    /// Fixed prefix (header + IV) every container of this scheme starts with
    pub fn prefix_len(self) -> usize {
        self.header_len() + IV_LEN
    }

    /// Length of the nonce portion of the IV
    pub fn nonce_len(self) -> usize {
        match self {
            ContainerScheme::CbcSizePrefixed => IV_LEN,
            ContainerScheme::CtrNonce96 => 12,
            ContainerScheme::CtrNonce64 => 8,
        }
    }

    /// Whether this is a counter-mode (stream) scheme
    pub fn is_counter_mode(self) -> bool {
        !matches!(self, ContainerScheme::CbcSizePrefixed)
    }

    /// Ciphertext length produced for a plaintext of `plaintext_len` bytes
    pub fn ciphertext_len(self, plaintext_len: usize) -> usize {
        match self {
            ContainerScheme::CbcSizePrefixed => (plaintext_len / BLOCK_SIZE)
                .saturating_add(1)
                .saturating_mul(BLOCK_SIZE),
            ContainerScheme::CtrNonce96 | ContainerScheme::CtrNonce64 => plaintext_len,
        }
    }

    /// Total container length produced for a plaintext of `plaintext_len` bytes
    pub fn container_len(self, plaintext_len: usize) -> usize {
        self.prefix_len().saturating_add(self.ciphertext_len(plaintext_len))
    }
}

impl fmt::Display for ContainerScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContainerScheme {
    type Err = ContainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cbc-size-prefixed" | "cbc" | "a" => Ok(ContainerScheme::CbcSizePrefixed),
            "ctr-nonce96" | "b" => Ok(ContainerScheme::CtrNonce96),
            "ctr-nonce64" | "c" => Ok(ContainerScheme::CtrNonce64),
            other => Err(ContainerError::UnknownScheme(other.to_string())),
        }
    }
}
