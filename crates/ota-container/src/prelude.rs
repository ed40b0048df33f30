//! Prelude for ota-container
//!
//! ```
//! use ota_container::prelude::*;
//!
//! let codec = ContainerCodec::new(ContainerScheme::CbcSizePrefixed, FirmwareKey::generate());
//! assert_eq!(codec.scheme().prefix_len(), 20);
//! ```

pub use crate::codec::ContainerCodec;
pub use crate::container::FirmwareContainer;
pub use crate::error::{ContainerError, ContainerResult};
pub use crate::iv::IvMaterial;
pub use crate::key::FirmwareKey;
pub use crate::scheme::ContainerScheme;
pub use crate::storage::{read_artifact, write_atomic, write_atomic_private};
