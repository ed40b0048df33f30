//! Error types for otactl

use ota_container::ContainerError;
use ota_manifest::ManifestError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Input not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Refusing to overwrite existing file: {} (use --force)", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid container: {0}")]
    InvalidContainer(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Container error: {0}")]
    Container(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error
    ///
    /// Code 2 is left to clap for usage errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::InvalidKey(_) => 3,
            CliError::InvalidContainer(_) => 4,
            CliError::NotFound(_) => 5,
            CliError::ValidationError(_) | CliError::AlreadyExists(_) => 6,
            _ => 1,
        }
    }
}

impl From<ContainerError> for CliError {
    fn from(e: ContainerError) -> Self {
        if e.is_format_error() {
            return CliError::InvalidContainer(e.to_string());
        }
        match e {
            ContainerError::InvalidKey(reason) => CliError::InvalidKey(reason),
            ContainerError::UnknownScheme(name) => {
                CliError::ValidationError(format!("unknown container scheme {name:?}"))
            }
            ContainerError::Io(io) => CliError::IoError(io),
            other => CliError::Container(other.to_string()),
        }
    }
}

impl From<ManifestError> for CliError {
    fn from(e: ManifestError) -> Self {
        match e {
            ManifestError::ArtifactNotFound(path) => CliError::NotFound(path),
            ManifestError::InvalidVersion { .. }
            | ManifestError::VersionOrder { .. }
            | ManifestError::InvalidUrl { .. } => CliError::ValidationError(e.to_string()),
            ManifestError::IntegrityMismatch { .. } => CliError::InvalidContainer(e.to_string()),
            ManifestError::Io(io) => CliError::IoError(io),
            ManifestError::Serialization(json) => CliError::JsonError(json),
        }
    }
}
