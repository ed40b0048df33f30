//! Command implementations for otactl

pub mod container;
pub mod keygen;
pub mod manifest;

use clap::{Args, Subcommand};
use ota_container::{ContainerScheme, DEFAULT_KEY_ENV, FirmwareKey};
use std::path::{Path, PathBuf};

use crate::error::CliError;

/// Where the firmware key comes from
#[derive(Args, Debug, Clone)]
pub struct KeySource {
    /// Key file holding 32 raw bytes or 64 hex characters
    #[arg(short, long)]
    pub key_file: Option<PathBuf>,

    /// Environment variable holding the hex key (used without --key-file)
    #[arg(long, default_value = DEFAULT_KEY_ENV)]
    pub key_env: String,
}

impl KeySource {
    /// Load the key from the file if given, otherwise from the environment
    pub fn load(&self) -> Result<FirmwareKey, CliError> {
        match &self.key_file {
            Some(path) => {
                ensure_exists(path)?;
                Ok(FirmwareKey::from_file(path)?)
            }
            None => Ok(FirmwareKey::from_env(&self.key_env)?),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ContainerCommands {
    /// Encrypt a plaintext firmware image into a container
    Encrypt {
        /// Plaintext firmware image
        input: PathBuf,
        /// Container output path (written atomically)
        #[arg(short, long)]
        output: PathBuf,
        /// Container scheme
        #[arg(short, long, env = "OTA_SCHEME", default_value = "cbc-size-prefixed")]
        scheme: ContainerScheme,
        #[command(flatten)]
        key: KeySource,
    },

    /// Decrypt a container back into the plaintext image
    Decrypt {
        /// Encrypted container
        input: PathBuf,
        /// Plaintext output path (written atomically)
        #[arg(short, long)]
        output: PathBuf,
        /// Container scheme the device is built for
        #[arg(short, long, env = "OTA_SCHEME", default_value = "cbc-size-prefixed")]
        scheme: ContainerScheme,
        #[command(flatten)]
        key: KeySource,
    },

    /// Show the wire fields of a container without decrypting it
    Inspect {
        /// Encrypted container
        input: PathBuf,
        /// Scheme to interpret the bytes as
        #[arg(short, long, env = "OTA_SCHEME", default_value = "cbc-size-prefixed")]
        scheme: ContainerScheme,
    },
}

/// Fail with [`CliError::NotFound`] when `path` does not exist
pub fn ensure_exists(path: &Path) -> Result<(), CliError> {
    if path.exists() {
        Ok(())
    } else {
        Err(CliError::NotFound(path.to_path_buf()))
    }
}
