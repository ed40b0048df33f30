//! OTA distribution daemon (otad)

#![deny(clippy::unwrap_used)]

use anyhow::{Context, Result};
use clap::Parser;
use ota_container::ContainerScheme;
use ota_service::{LoggingConfig, ServiceConfig, init_logging};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "otad")]
#[command(about = "Serve an encrypted firmware container and its manifest over TLS")]
#[command(version)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, env = "OTA_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// TLS certificate chain (PEM)
    #[arg(long)]
    cert: Option<PathBuf>,

    /// TLS private key (PEM)
    #[arg(long)]
    tls_key: Option<PathBuf>,

    /// Container served at the firmware route
    #[arg(long)]
    artifact: Option<PathBuf>,

    /// Base URL devices use to reach this server
    #[arg(long)]
    public_base_url: Option<String>,

    /// Release version advertised in the manifest
    #[arg(long)]
    release_version: Option<String>,

    /// Lowest eligible device version
    #[arg(long)]
    min_version: Option<String>,

    /// Release description
    #[arg(long)]
    description: Option<String>,

    /// Encrypt this plaintext image into the artifact path before serving
    #[arg(long)]
    publish: Option<PathBuf>,

    /// Container scheme used with --publish
    #[arg(long)]
    scheme: Option<ContainerScheme>,

    /// Key file used with --publish (otherwise the key environment variable)
    #[arg(long)]
    key_file: Option<PathBuf>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn apply(self, config: &mut ServiceConfig) {
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(cert) = self.cert {
            config.tls.cert_path = cert;
        }
        if let Some(key) = self.tls_key {
            config.tls.key_path = key;
        }
        if let Some(artifact) = self.artifact {
            config.artifact_path = artifact;
        }
        if let Some(base) = self.public_base_url {
            config.public_base_url = Some(base);
        }
        if let Some(version) = self.release_version {
            config.release.version = version;
        }
        if let Some(min_version) = self.min_version {
            config.release.min_version = min_version;
        }
        if let Some(description) = self.description {
            config.release.description = description;
        }
        if let Some(image) = self.publish {
            config.publish.source_image = Some(image);
        }
        if let Some(scheme) = self.scheme {
            config.publish.scheme = scheme;
        }
        if let Some(key_file) = self.key_file {
            config.publish.key_file = Some(key_file);
        }
        if self.json_logs {
            config.logging.json = true;
        }
        match self.verbose {
            0 => {}
            1 => config.logging.level = "debug".to_string(),
            _ => config.logging.level = "trace".to_string(),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServiceConfig::load(args.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    init_logging(LoggingConfig::try_from(&config.logging)?)
        .context("Failed to initialise logging")?;
    info!("Starting otad v{}", env!("CARGO_PKG_VERSION"));

    if let Some(digest) = ota_service::publish_container(&config)
        .await
        .context("Failed to publish firmware container")?
    {
        info!(size = digest.size, "Container ready");
    }

    ota_service::run(config, shutdown_signal())
        .await
        .context("Distribution endpoint failed")?;

    info!("otad stopped");
    Ok(())
}
