//! IV material and its per-scheme nonce/counter views

use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;

use crate::scheme::{ContainerScheme, IV_LEN};

/// Initial counter value for [`ContainerScheme::CtrNonce96`]
pub const NONCE96_INITIAL_COUNTER: u32 = 1;

/// The 16-byte IV field of a container
///
/// The bytes are stored exactly as they appear on the wire. How they split
/// into nonce and counter depends on the scheme the container was encoded
/// with, which is why the accessors take the scheme explicitly.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct IvMaterial([u8; IV_LEN]);

impl IvMaterial {
    /// Wrap raw IV bytes
    pub fn from_bytes(bytes: [u8; IV_LEN]) -> Self {
        Self(bytes)
    }

    /// Generate fresh IV material for `scheme` from the operating system RNG
    ///
    /// - CBC: 16 random bytes
    /// - CTR 12/4: 12 random nonce bytes followed by counter `1` (big-endian)
    /// - CTR 8/8: 16 random bytes (random nonce and random initial counter)
    pub fn generate(scheme: ContainerScheme) -> Self {
        let mut bytes = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut bytes);

        if scheme == ContainerScheme::CtrNonce96 {
            let (_, counter) = bytes.split_at_mut(12);
            counter.copy_from_slice(&NONCE96_INITIAL_COUNTER.to_be_bytes());
        }

        Self(bytes)
    }

    /// Raw wire bytes
    pub fn as_bytes(&self) -> &[u8; IV_LEN] {
        &self.0
    }

    /// Nonce portion of the IV for `scheme` (the whole IV for CBC)
    pub fn nonce(&self, scheme: ContainerScheme) -> &[u8] {
        let (nonce, _) = self.0.split_at(scheme.nonce_len());
        nonce
    }

    /// Initial counter value for counter-mode schemes
    ///
    /// CTR 12/4 stores a big-endian `u32`; CTR 8/8 stores a little-endian
    /// `u64`. Returns `None` for CBC.
    pub fn counter(&self, scheme: ContainerScheme) -> Option<u64> {
        let (_, tail) = self.0.split_at(scheme.nonce_len());
        match scheme {
            ContainerScheme::CbcSizePrefixed => None,
            ContainerScheme::CtrNonce96 => {
                let word: [u8; 4] = tail.try_into().ok()?;
                Some(u64::from(u32::from_be_bytes(word)))
            }
            ContainerScheme::CtrNonce64 => {
                let word: [u8; 8] = tail.try_into().ok()?;
                Some(u64::from_le_bytes(word))
            }
        }
    }

    /// Initial AES-CTR counter block for `scheme`
    ///
    /// For CTR 12/4 this is the IV itself. For CTR 8/8 the little-endian
    /// counter field is re-encoded big-endian behind the nonce so the block
    /// cipher sees `nonce || counter_be`. CBC returns the IV unchanged.
    pub(crate) fn counter_block(&self, scheme: ContainerScheme) -> [u8; IV_LEN] {
        match (scheme, self.counter(scheme)) {
            (ContainerScheme::CtrNonce64, Some(counter)) => {
                let mut block = [0u8; IV_LEN];
                let (nonce, ctr) = block.split_at_mut(8);
                nonce.copy_from_slice(self.nonce(scheme));
                ctr.copy_from_slice(&counter.to_be_bytes());
                block
            }
            _ => self.0,
        }
    }
}

impl fmt::Debug for IvMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IvMaterial({})", hex::encode(self.0))
    }
}

impl From<[u8; IV_LEN]> for IvMaterial {
    fn from(bytes: [u8; IV_LEN]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IvMaterial {
        IvMaterial::from_bytes([
            0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
            0x0e, 0x0f,
        ])
    }

    #[test]
    fn test_nonce96_generation_fixes_counter() {
        for _ in 0..32 {
            let iv = IvMaterial::generate(ContainerScheme::CtrNonce96);
            assert_eq!(iv.counter(ContainerScheme::CtrNonce96), Some(1));
            assert_eq!(iv.as_bytes().get(12..), Some(&[0u8, 0, 0, 1][..]));
        }
    }

    #[test]
    fn test_nonce96_split() {
        let iv = sample();
        assert_eq!(iv.nonce(ContainerScheme::CtrNonce96).len(), 12);
        assert_eq!(iv.counter(ContainerScheme::CtrNonce96), Some(0x0c0d_0e0f));
    }

    #[test]
    fn test_nonce64_split_is_little_endian() {
        let iv = sample();
        assert_eq!(iv.nonce(ContainerScheme::CtrNonce64), &[0, 1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(
            iv.counter(ContainerScheme::CtrNonce64),
            Some(0x0f0e_0d0c_0b0a_0908)
        );
    }

    #[test]
    fn test_counter_blocks_differ_between_ctr_schemes() {
        let iv = sample();
        let block_b = iv.counter_block(ContainerScheme::CtrNonce96);
        let block_c = iv.counter_block(ContainerScheme::CtrNonce64);
        assert_eq!(&block_b, iv.as_bytes());
        assert_eq!(
            block_c,
            [0, 1, 2, 3, 4, 5, 6, 7, 0x0f, 0x0e, 0x0d, 0x0c, 0x0b, 0x0a, 0x09, 0x08]
        );
        assert_ne!(block_b, block_c);
    }

    #[test]
    fn test_cbc_has_no_counter() {
        assert_eq!(sample().counter(ContainerScheme::CbcSizePrefixed), None);
        assert_eq!(sample().nonce(ContainerScheme::CbcSizePrefixed).len(), 16);
    }
}
