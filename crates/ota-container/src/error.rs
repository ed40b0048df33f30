//! Error types for container encode/decode operations

use thiserror::Error;

/// Container codec errors
#[derive(Error, Debug)]
pub enum ContainerError {
    /// Final CBC block does not carry valid PKCS#7 padding
    #[error("Invalid PKCS#7 padding in final block")]
    Padding,

    /// Size header declares more bytes than the unpadded plaintext holds
    #[error("Declared length {declared} exceeds decrypted length {actual}")]
    LengthMismatch {
        /// Length from the 4-byte size header
        declared: usize,
        /// Length left after padding removal
        actual: usize,
    },

    /// Input is shorter than the fixed header + IV prefix of the scheme
    #[error("Container too short: expected at least {expected} bytes, got {actual}")]
    InputTooShort {
        /// Minimum prefix length for the configured scheme
        expected: usize,
        /// Length of the input
        actual: usize,
    },

    /// Plaintext does not fit in the 32-bit size header
    #[error("Plaintext of {0} bytes does not fit in a 32-bit size header")]
    PlaintextTooLarge(usize),

    /// Key material could not be parsed
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Scheme name not recognised
    #[error("Unknown container scheme: {0}")]
    UnknownScheme(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContainerError {
    /// Whether this error comes from malformed container bytes
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::Padding | Self::LengthMismatch { .. } | Self::InputTooShort { .. }
        )
    }
}

impl From<hex::FromHexError> for ContainerError {
    fn from(e: hex::FromHexError) -> Self {
        ContainerError::InvalidKey(format!("hex decode error: {}", e))
    }
}

/// Result type for container operations
pub type ContainerResult<T> = std::result::Result<T, ContainerError>;
