//! Encrypted firmware containers for over-the-air delivery
//!
//! A firmware image is encrypted with a pre-shared AES-256 key into a
//! self-contained byte sequence ("container") that a constrained device can
//! decrypt. Three mutually incompatible layouts are supported:
//!
//! | Scheme | Layout |
//! |--------|--------|
//! | [`ContainerScheme::CbcSizePrefixed`] | `u32 LE size` ‖ 16-byte IV ‖ AES-256-CBC ciphertext (PKCS#7) |
//! | [`ContainerScheme::CtrNonce96`] | 12-byte nonce ‖ `u32 BE` counter (= 1) ‖ AES-256-CTR ciphertext |
//! | [`ContainerScheme::CtrNonce64`] | 8-byte nonce ‖ `u64 LE` counter ‖ AES-256-CTR ciphertext |
//!
//! Containers carry no scheme tag and no authentication tag. The consumer
//! must be configured with the same scheme as the producer, and integrity is
//! established out of band by comparing the SHA-256 of the container against
//! the published manifest.
//!
//! # Modules
//!
//! - [`codec`]: encode/decode under one scheme and key
//! - [`container`]: wire-level split of container bytes
//! - [`scheme`]: scheme identifiers and size arithmetic
//! - [`key`]: key loading, generation and fingerprinting
//! - [`iv`]: IV generation and nonce/counter views
//! - [`storage`]: atomic artifact writes
//! - [`error`]: error types
//!
//! # Example
//!
//! ```
//! use ota_container::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let key = FirmwareKey::generate();
//! let codec = ContainerCodec::new(ContainerScheme::CtrNonce96, key);
//!
//! let firmware = b"\x7fELF firmware image";
//! let container = codec.encode_to_vec(firmware)?;
//! assert_eq!(container.len(), 16 + firmware.len());
//!
//! let decoded = codec.decode(&container)?;
//! assert_eq!(decoded, firmware);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod codec;
pub mod container;
pub mod error;
pub mod iv;
pub mod key;
pub mod prelude;
pub mod scheme;
pub mod storage;

pub use codec::{ContainerCodec, pad_pkcs7, strip_pkcs7};
pub use container::FirmwareContainer;
pub use error::{ContainerError, ContainerResult};
pub use iv::IvMaterial;
pub use key::{DEFAULT_KEY_ENV, FirmwareKey, KEY_LEN};
pub use scheme::{BLOCK_SIZE, ContainerScheme, IV_LEN, SIZE_HEADER_LEN};
pub use storage::{read_artifact, write_atomic, write_atomic_private};
