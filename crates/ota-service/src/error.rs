//! Error types for the distribution service

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Distribution service errors
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Certificate or private key could not be loaded
    #[error("TLS setup failed for {}: {reason}", .path.display())]
    Tls {
        /// File being loaded
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: SocketAddr,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Publishing a container at startup failed
    #[error("Container error: {0}")]
    Container(#[from] ota_container::ContainerError),

    /// Manifest construction failed
    #[error("Manifest error: {0}")]
    Manifest(#[from] ota_manifest::ManifestError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for service operations
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
