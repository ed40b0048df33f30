//! Known-answer and error-path tests for the container codec

use ota_container::prelude::*;
use sha2::{Digest, Sha256};

const NIST_KEY: &str = "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4";
const NIST_BLOCK: &str = "6bc1bee22e409f96e93d7e117393172a";

fn nist_codec(scheme: ContainerScheme) -> Result<ContainerCodec, ContainerError> {
    Ok(ContainerCodec::new(scheme, FirmwareKey::from_hex(NIST_KEY)?))
}

fn iv_from_hex(encoded: &str) -> Result<IvMaterial, Box<dyn std::error::Error>> {
    let bytes: [u8; 16] = hex::decode(encoded)?
        .try_into()
        .map_err(|_| "IV must be 16 bytes")?;
    Ok(IvMaterial::from_bytes(bytes))
}

mod layout {
    use super::*;

    #[test]
    fn test_cbc_seventeen_byte_image() -> Result<(), Box<dyn std::error::Error>> {
        let codec = ContainerCodec::new(
            ContainerScheme::CbcSizePrefixed,
            FirmwareKey::from_bytes([0x11; 32]),
        );
        let plaintext = [0xAAu8; 17];

        let container = codec.encode_with_iv(&plaintext, IvMaterial::from_bytes([0u8; 16]))?;
        let bytes = container.to_bytes();

        assert_eq!(bytes.len(), 52);
        assert_eq!(bytes.get(..4), Some(&[0x11, 0x00, 0x00, 0x00][..]));
        assert_eq!(bytes.get(4..20), Some(&[0u8; 16][..]));
        assert_eq!(container.ciphertext().len(), 32);
        assert_eq!(codec.decode(&bytes)?, plaintext);
        Ok(())
    }

    #[test]
    fn test_container_lengths() -> Result<(), ContainerError> {
        let key = FirmwareKey::generate();
        for len in [0usize, 1, 15, 16, 17, 31, 32, 1000] {
            let plaintext = vec![0x5Au8; len];
            for scheme in ContainerScheme::ALL {
                let codec = ContainerCodec::new(scheme, key.clone());
                let bytes = codec.encode_to_vec(&plaintext)?;
                assert_eq!(bytes.len(), scheme.container_len(len), "{scheme} len {len}");
            }
        }
        Ok(())
    }

    #[test]
    fn test_cbc_aligned_plaintext_gets_padding_block() -> Result<(), ContainerError> {
        let codec = ContainerCodec::new(ContainerScheme::CbcSizePrefixed, FirmwareKey::generate());
        let container = codec.encode(&[0u8; 32])?;
        assert_eq!(container.ciphertext().len(), 48);
        assert_eq!(container.size_header(), Some(32));
        Ok(())
    }

    #[test]
    fn test_nonce96_counter_field() -> Result<(), ContainerError> {
        let codec = ContainerCodec::new(ContainerScheme::CtrNonce96, FirmwareKey::generate());
        let bytes = codec.encode_to_vec(b"abc")?;
        assert_eq!(bytes.get(12..16), Some(&[0u8, 0, 0, 1][..]));
        assert_eq!(bytes.len(), 19);
        Ok(())
    }

    #[test]
    fn test_empty_plaintext() -> Result<(), ContainerError> {
        let key = FirmwareKey::generate();
        for scheme in ContainerScheme::ALL {
            let codec = ContainerCodec::new(scheme, key.clone());
            let bytes = codec.encode_to_vec(&[])?;
            assert!(codec.decode(&bytes)?.is_empty());
        }
        Ok(())
    }
}

mod known_answer {
    use super::*;

    #[test]
    fn test_cbc_first_block_matches_sp800_38a() -> Result<(), Box<dyn std::error::Error>> {
        let codec = nist_codec(ContainerScheme::CbcSizePrefixed)?;
        let iv = iv_from_hex("000102030405060708090a0b0c0d0e0f")?;
        let plaintext = hex::decode(NIST_BLOCK)?;

        let container = codec.encode_with_iv(&plaintext, iv)?;

        assert_eq!(
            hex::encode(container.ciphertext().get(..16).unwrap_or_default()),
            "f58c4c04d6e5f1ba779eabfb5f7bfbd6"
        );
        assert_eq!(codec.decode(&container.to_bytes())?, plaintext);
        Ok(())
    }

    #[test]
    fn test_nonce96_matches_sp800_38a() -> Result<(), Box<dyn std::error::Error>> {
        let codec = nist_codec(ContainerScheme::CtrNonce96)?;
        let iv = iv_from_hex("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff")?;
        let plaintext = hex::decode(NIST_BLOCK)?;

        let container = codec.encode_with_iv(&plaintext, iv)?;

        assert_eq!(
            hex::encode(container.ciphertext()),
            "601ec313775789a5b7a7f504bbf3d228"
        );
        Ok(())
    }

    #[test]
    fn test_nonce64_counter_is_stored_little_endian() -> Result<(), Box<dyn std::error::Error>> {
        // Counter field bytes are the reverse of the big-endian counter block tail.
        let codec = nist_codec(ContainerScheme::CtrNonce64)?;
        let iv = iv_from_hex("f0f1f2f3f4f5f6f7fffefdfcfbfaf9f8")?;
        let plaintext = hex::decode(NIST_BLOCK)?;

        let container = codec.encode_with_iv(&plaintext, iv)?;

        assert_eq!(
            hex::encode(container.ciphertext()),
            "601ec313775789a5b7a7f504bbf3d228"
        );
        assert_eq!(
            iv.counter(ContainerScheme::CtrNonce64),
            Some(0xf8f9_fafb_fcfd_feff)
        );
        Ok(())
    }

    #[test]
    fn test_nonce64_device_decryptor_must_reverse_counter() -> Result<(), Box<dyn std::error::Error>>
    {
        use aes::Aes256;
        use aes::cipher::{KeyIvInit, StreamCipher};

        let key: [u8; 32] = hex::decode(NIST_KEY)?
            .try_into()
            .map_err(|_| "key must be 32 bytes")?;
        let codec = nist_codec(ContainerScheme::CtrNonce64)?;
        let iv = iv_from_hex("f0f1f2f3f4f5f6f7fffefdfcfbfaf9f8")?;
        let plaintext: Vec<u8> = (0..64u8).collect();
        let container = codec.encode_with_iv(&plaintext, iv)?;

        // Loading the stored IV straight into a CTR state does not interoperate.
        let mut raw = container.ciphertext().to_vec();
        ctr::Ctr128BE::<Aes256>::new((&key).into(), iv.as_bytes().into())
            .apply_keystream(&mut raw);
        assert_ne!(raw, plaintext);

        // Byte-reversing the counter tail into big-endian does.
        let mut block = *iv.as_bytes();
        if let Some(tail) = block.get_mut(8..) {
            tail.reverse();
        }
        assert_eq!(hex::encode(block), "f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff");
        let mut decrypted = container.ciphertext().to_vec();
        ctr::Ctr64BE::<Aes256>::new((&key).into(), (&block).into())
            .apply_keystream(&mut decrypted);
        assert_eq!(decrypted, plaintext);
        Ok(())
    }
}

mod decode_errors {
    use super::*;

    #[test]
    fn test_input_too_short_for_every_scheme() -> Result<(), Box<dyn std::error::Error>> {
        let key = FirmwareKey::generate();
        for scheme in ContainerScheme::ALL {
            let codec = ContainerCodec::new(scheme, key.clone());
            let short_len = scheme.prefix_len() - 1;
            let Err(ContainerError::InputTooShort { expected, actual }) =
                codec.decode(&vec![0u8; short_len])
            else {
                return Err(format!("{scheme}: expected InputTooShort").into());
            };
            assert_eq!(expected, scheme.prefix_len());
            assert_eq!(actual, short_len);
        }
        Ok(())
    }

    #[test]
    fn test_cbc_without_ciphertext_is_padding_error() {
        let codec = ContainerCodec::new(ContainerScheme::CbcSizePrefixed, FirmwareKey::generate());
        assert!(matches!(
            codec.decode(&[0u8; 20]),
            Err(ContainerError::Padding)
        ));
    }

    #[test]
    fn test_cbc_unaligned_ciphertext_is_padding_error() -> Result<(), ContainerError> {
        let codec = ContainerCodec::new(ContainerScheme::CbcSizePrefixed, FirmwareKey::generate());
        let mut bytes = codec.encode_to_vec(b"firmware")?;
        bytes.push(0);
        assert!(matches!(codec.decode(&bytes), Err(ContainerError::Padding)));
        Ok(())
    }

    /// Truncating a CBC container to its first ciphertext block leaves the
    /// original plaintext block as the "final" block. With a last byte of
    /// 0x41 that block can never carry valid padding.
    #[test]
    fn test_cbc_invalid_padding_detected() -> Result<(), ContainerError> {
        let codec = ContainerCodec::new(ContainerScheme::CbcSizePrefixed, FirmwareKey::generate());
        let bytes = codec.encode_to_vec(&[0x41u8; 16])?;
        assert_eq!(bytes.len(), 52);

        let truncated = bytes.get(..36).unwrap_or_default();
        assert!(matches!(codec.decode(truncated), Err(ContainerError::Padding)));
        Ok(())
    }

    fn rewrite_size_header(bytes: &mut [u8], size: u32) {
        if let Some(header) = bytes.get_mut(..4) {
            header.copy_from_slice(&size.to_le_bytes());
        }
    }

    #[test]
    fn test_cbc_declared_length_exceeds_plaintext() -> Result<(), Box<dyn std::error::Error>> {
        let codec = ContainerCodec::new(ContainerScheme::CbcSizePrefixed, FirmwareKey::generate());
        let mut bytes = codec.encode_to_vec(b"short")?;
        rewrite_size_header(&mut bytes, 100);

        let Err(ContainerError::LengthMismatch { declared, actual }) = codec.decode(&bytes) else {
            return Err("expected LengthMismatch".into());
        };
        assert_eq!(declared, 100);
        assert_eq!(actual, 5);
        Ok(())
    }

    #[test]
    fn test_cbc_declared_length_shorter_truncates() -> Result<(), ContainerError> {
        let codec = ContainerCodec::new(ContainerScheme::CbcSizePrefixed, FirmwareKey::generate());
        let mut bytes = codec.encode_to_vec(b"firmware image")?;
        rewrite_size_header(&mut bytes, 8);

        assert_eq!(codec.decode(&bytes)?, b"firmware");
        Ok(())
    }

    #[test]
    fn test_format_errors_are_classified() {
        assert!(ContainerError::Padding.is_format_error());
        assert!(!ContainerError::InvalidKey("x".into()).is_format_error());
    }
}

mod integrity {
    use super::*;

    fn sha256_hex(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    #[test]
    fn test_ctr_schemes_do_not_interoperate() -> Result<(), Box<dyn std::error::Error>> {
        let key = FirmwareKey::generate();
        let plaintext = b"bootloader stage two, version 2.0.0".to_vec();
        let iv = iv_from_hex("00112233445566778899aabb00000001")?;

        let nonce96 = ContainerCodec::new(ContainerScheme::CtrNonce96, key.clone());
        let nonce64 = ContainerCodec::new(ContainerScheme::CtrNonce64, key);

        let from_b = nonce96.encode_with_iv(&plaintext, iv)?.to_bytes();
        let b_as_c = nonce64.decode(&from_b)?;
        assert_ne!(b_as_c, plaintext);
        assert_ne!(sha256_hex(&b_as_c), sha256_hex(&plaintext));

        let from_c = nonce64.encode_with_iv(&plaintext, iv)?.to_bytes();
        let c_as_b = nonce96.decode(&from_c)?;
        assert_ne!(c_as_b, plaintext);
        Ok(())
    }

    #[test]
    fn test_ctr_container_read_as_cbc_never_yields_plaintext() -> Result<(), ContainerError> {
        let key = FirmwareKey::generate();
        let plaintext = vec![0x33u8; 64];
        let ctr = ContainerCodec::new(ContainerScheme::CtrNonce96, key.clone());
        let cbc = ContainerCodec::new(ContainerScheme::CbcSizePrefixed, key);

        let bytes = ctr.encode_to_vec(&plaintext)?;
        match cbc.decode(&bytes) {
            Ok(decoded) => assert_ne!(decoded, plaintext),
            Err(e) => assert!(e.is_format_error()),
        }
        Ok(())
    }

    #[test]
    fn test_wrong_key_does_not_recover_plaintext() -> Result<(), ContainerError> {
        let plaintext = vec![0x77u8; 48];
        let writer = ContainerCodec::new(ContainerScheme::CtrNonce64, FirmwareKey::generate());
        let reader = ContainerCodec::new(ContainerScheme::CtrNonce64, FirmwareKey::generate());

        let bytes = writer.encode_to_vec(&plaintext)?;
        assert_ne!(reader.decode(&bytes)?, plaintext);
        Ok(())
    }

    #[test]
    fn test_bit_flip_changes_container_digest() -> Result<(), ContainerError> {
        let codec = ContainerCodec::new(ContainerScheme::CtrNonce96, FirmwareKey::generate());
        let bytes = codec.encode_to_vec(b"payload")?;
        let published = sha256_hex(&bytes);

        let mut tampered = bytes.clone();
        if let Some(last) = tampered.last_mut() {
            *last ^= 0x01;
        }

        assert_ne!(sha256_hex(&tampered), published);
        // Counter mode decodes the tampered bytes without complaint.
        assert_ne!(codec.decode(&tampered)?, b"payload");
        Ok(())
    }

    #[test]
    fn test_decode_container_reparses_foreign_scheme() -> Result<(), ContainerError> {
        let key = FirmwareKey::generate();
        let cbc = ContainerCodec::new(ContainerScheme::CbcSizePrefixed, key.clone());
        let ctr = ContainerCodec::new(ContainerScheme::CtrNonce96, key);

        let container = ctr.encode(&[1u8; 40])?;
        match cbc.decode_container(&container) {
            Ok(decoded) => assert_ne!(decoded, vec![1u8; 40]),
            Err(e) => assert!(e.is_format_error()),
        }
        Ok(())
    }
}
