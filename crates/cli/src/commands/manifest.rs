//! Manifest generation and verification commands

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use ota_container::write_atomic;
use ota_manifest::{FirmwareManifest, ManifestBuilder, ManifestTemplate, digest_file};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::commands::ensure_exists;
use crate::error::CliError;
use crate::output;

/// Arguments of `otactl manifest`
#[derive(Args, Debug)]
pub struct ManifestArgs {
    /// Encrypted container the manifest describes
    pub artifact: PathBuf,

    /// Release version
    #[arg(long, env = "OTA_VERSION", default_value = "2.0.0")]
    pub release_version: String,

    /// Lowest device version eligible for the update
    #[arg(long, env = "OTA_MIN_VERSION", default_value = "1.0.0")]
    pub min_version: String,

    /// Absolute URL devices download the container from
    #[arg(long)]
    pub url: String,

    /// Release description
    #[arg(long, env = "OTA_DESCRIPTION", default_value = "Local OTA update")]
    pub description: String,

    /// Build date (RFC 3339); defaults to now
    #[arg(long)]
    pub build_date: Option<DateTime<Utc>>,

    /// Write the manifest here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct ManifestFileReport {
    path: PathBuf,
    version: String,
    size: u64,
    sha256: String,
}

#[derive(Debug, Serialize)]
struct VerifyReport {
    artifact: PathBuf,
    version: String,
    size: u64,
    sha256: String,
    verified: bool,
}

/// Execute manifest command
pub async fn execute(args: &ManifestArgs, json: bool) -> Result<()> {
    let manifest = build(args).await?;
    let rendered = manifest.to_json_pretty().map_err(CliError::from)?;

    let Some(path) = &args.output else {
        println!("{rendered}");
        return Ok(());
    };

    if path.exists() && !args.force {
        return Err(CliError::AlreadyExists(path.clone()).into());
    }
    write_atomic(path, rendered.as_bytes())
        .await
        .map_err(CliError::from)?;
    info!(path = ?path, "Manifest written");

    let report = ManifestFileReport {
        path: path.clone(),
        version: manifest.version.to_string(),
        size: manifest.size,
        sha256: manifest.sha256,
    };
    output::print_report("Manifest written", &report, json)?;
    Ok(())
}

/// Build the manifest described by `args`
pub async fn build(args: &ManifestArgs) -> Result<FirmwareManifest, CliError> {
    let template = ManifestTemplate::new(
        &args.release_version,
        &args.min_version,
        &args.url,
        args.description.clone(),
    )?;
    let digest = digest_file(&args.artifact).await?;
    let build_date = args.build_date.unwrap_or_else(Utc::now);
    Ok(ManifestBuilder::new(template).build_from_digest(digest, build_date))
}

/// Execute verify command: check `artifact` against a manifest file
pub async fn verify(manifest_path: &Path, artifact: &Path, json: bool) -> Result<()> {
    ensure_exists(manifest_path)?;
    ensure_exists(artifact)?;

    let text = tokio::fs::read_to_string(manifest_path)
        .await
        .map_err(CliError::from)?;
    let manifest = FirmwareManifest::from_json(&text).map_err(CliError::from)?;
    let bytes = tokio::fs::read(artifact).await.map_err(CliError::from)?;
    manifest.verify_artifact(&bytes).map_err(CliError::from)?;

    let report = VerifyReport {
        artifact: artifact.to_path_buf(),
        version: manifest.version.to_string(),
        size: manifest.size,
        sha256: manifest.sha256,
        verified: true,
    };
    output::print_report("Artifact matches manifest", &report, json)?;
    Ok(())
}
