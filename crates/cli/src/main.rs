//! otactl - OTA firmware container tool
//!
//! Encrypts firmware images into the container formats understood by the
//! device updater, decrypts and inspects containers, and generates the
//! manifest the distribution endpoint serves.

#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod error;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::ContainerCommands;
use crate::commands::manifest::ManifestArgs;
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "otactl")]
#[command(about = "OTA firmware tool - build, inspect and decrypt encrypted firmware containers")]
#[command(version)]
#[command(long_about = "
otactl prepares firmware for over-the-air delivery. It encrypts plaintext
images into one of three container schemes (cbc-size-prefixed, ctr-nonce96,
ctr-nonce64), decrypts them again for testing, and writes the manifest that
devices poll for updates.

The key is read from --key-file or from the OTA_FIRMWARE_KEY environment
variable. Use --json for machine-readable output suitable for scripting.
")]
struct Cli {
    /// Output format (human-readable or JSON)
    #[arg(
        long,
        global = true,
        help = "Output in JSON format for machine parsing"
    )]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Container(ContainerCommands),

    /// Generate the manifest describing a container
    Manifest(ManifestArgs),

    /// Check a downloaded container against its manifest
    Verify {
        /// Manifest JSON file
        #[arg(short, long)]
        manifest: PathBuf,
        /// Container to check
        artifact: PathBuf,
    },

    /// Generate a random AES-256 firmware key
    Keygen {
        /// Write the hex key to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite an existing key file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // Logs go to stderr so --json output stays parseable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("otactl={log_level},ota_container={log_level},ota_manifest={log_level}")
                    .into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match execute_command(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }

            let exit_code = e
                .downcast_ref::<CliError>()
                .map_or(1, CliError::exit_code);
            ExitCode::from(exit_code)
        }
    }
}

async fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Container(cmd) => commands::container::execute(cmd, cli.json).await,
        Commands::Manifest(args) => commands::manifest::execute(args, cli.json).await,
        Commands::Verify { manifest, artifact } => {
            commands::manifest::verify(manifest, artifact, cli.json).await
        }
        Commands::Keygen { output, force } => {
            commands::keygen::execute(output.as_deref(), *force, cli.json).await
        }
    }
}
