//! Parsed representation of an encrypted firmware container

use crate::error::{ContainerError, ContainerResult};
use crate::iv::IvMaterial;
use crate::scheme::{ContainerScheme, IV_LEN, SIZE_HEADER_LEN};

/// An encrypted firmware container split into its wire fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareContainer {
    scheme: ContainerScheme,
    size_header: Option<u32>,
    iv: IvMaterial,
    ciphertext: Vec<u8>,
}

impl FirmwareContainer {
    pub(crate) fn new(
        scheme: ContainerScheme,
        size_header: Option<u32>,
        iv: IvMaterial,
        ciphertext: Vec<u8>,
    ) -> Self {
        Self {
            scheme,
            size_header,
            iv,
            ciphertext,
        }
    }

    /// Split container bytes according to `scheme`
    ///
    /// Only the fixed prefix is checked here; padding and length checks
    /// happen during decryption.
    pub fn parse(scheme: ContainerScheme, bytes: &[u8]) -> ContainerResult<Self> {
        let expected = scheme.prefix_len();
        if bytes.len() < expected {
            return Err(ContainerError::InputTooShort {
                expected,
                actual: bytes.len(),
            });
        }

        let too_short = || ContainerError::InputTooShort {
            expected,
            actual: bytes.len(),
        };

        let (header, rest) = bytes.split_at(scheme.header_len());
        let (iv, ciphertext) = rest.split_at(IV_LEN);

        let size_header = match scheme {
            ContainerScheme::CbcSizePrefixed => {
                let word: [u8; SIZE_HEADER_LEN] = header.try_into().map_err(|_| too_short())?;
                Some(u32::from_le_bytes(word))
            }
            ContainerScheme::CtrNonce96 | ContainerScheme::CtrNonce64 => None,
        };

        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| too_short())?;

        Ok(Self {
            scheme,
            size_header,
            iv: IvMaterial::from_bytes(iv),
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// Serialize to wire bytes: `[size header] || IV || ciphertext`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        if let Some(size) = self.size_header {
            out.extend_from_slice(&size.to_le_bytes());
        }
        out.extend_from_slice(self.iv.as_bytes());
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Scheme this container was encoded with
    pub fn scheme(&self) -> ContainerScheme {
        self.scheme
    }

    /// Declared plaintext length (CBC scheme only)
    pub fn size_header(&self) -> Option<u32> {
        self.size_header
    }

    /// IV field
    pub fn iv(&self) -> &IvMaterial {
        &self.iv
    }

    /// Encrypted payload
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Total wire length
    pub fn len(&self) -> usize {
        self.scheme.prefix_len().saturating_add(self.ciphertext.len())
    }

    /// Whether the container carries no ciphertext
    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }
}
