//! OTA distribution endpoint
//!
//! Serves one encrypted firmware container and a manifest describing it
//! over TLS. The manifest is recomputed from the artifact on disk for each
//! request, so replacing the container takes effect without a restart.
//!
//! - [`config`]: layered daemon configuration
//! - [`routes`]: axum router and handlers
//! - [`server`]: TLS accept loop
//! - [`tls`]: rustls configuration from PEM files
//! - [`logging`]: tracing subscriber setup

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod server;
pub mod tls;

pub use config::{ServiceConfig, detect_local_ip};
pub use error::{ServiceError, ServiceResult};
pub use logging::{LoggingConfig, init_logging};
pub use routes::{AppState, router};

use ota_container::{ContainerCodec, FirmwareKey};
use ota_manifest::{ArtifactDigest, ManifestBuilder, digest_bytes};
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use tokio_rustls::TlsAcceptor;
use tracing::info;

/// Build the request state for `config`, resolving the firmware URL against
/// `local_ip`
pub fn build_state(config: &ServiceConfig, local_ip: IpAddr) -> ServiceResult<AppState> {
    let template = config.manifest_template(local_ip)?;
    info!(
        firmware_url = %template.firmware_url(),
        version = %template.version(),
        "Manifest template ready"
    );
    Ok(AppState::new(
        config.artifact_path.clone(),
        ManifestBuilder::new(template),
    ))
}

/// Load the key configured for publication
pub fn load_publish_key(config: &ServiceConfig) -> ServiceResult<FirmwareKey> {
    let key = match &config.publish.key_file {
        Some(path) => FirmwareKey::from_file(path)?,
        None => FirmwareKey::from_env(&config.publish.key_env)?,
    };
    Ok(key)
}

/// Encrypt the configured source image into the artifact path
///
/// Returns `None` when no source image is configured. The container is
/// written atomically, so a running server never serves a partial file.
pub async fn publish_container(config: &ServiceConfig) -> ServiceResult<Option<ArtifactDigest>> {
    let Some(source) = &config.publish.source_image else {
        return Ok(None);
    };

    let codec = ContainerCodec::new(config.publish.scheme, load_publish_key(config)?);
    let image = ota_container::read_artifact(source).await?;
    let container = codec.encode_to_vec(&image)?;
    ota_container::write_atomic(&config.artifact_path, &container).await?;

    let digest = digest_bytes(&container);
    info!(
        source = ?source,
        artifact = ?config.artifact_path,
        scheme = %config.publish.scheme,
        key = %codec.key_fingerprint(),
        size = digest.size,
        sha256 = %digest.sha256,
        "Published firmware container"
    );
    Ok(Some(digest))
}

/// Run the distribution endpoint until `shutdown` resolves
pub async fn run<F>(config: ServiceConfig, shutdown: F) -> ServiceResult<()>
where
    F: Future<Output = ()> + Send,
{
    config.validate()?;

    let local_ip = detect_local_ip();
    let state = build_state(&config, local_ip)?;
    let app = router(state, &config.routes);

    let tls_config = tls::load_server_config(&config.tls.cert_path, &config.tls.key_path)?;
    let acceptor = TlsAcceptor::from(tls_config);
    let listener = server::bind(config.bind_addr).await?;

    let public_addr = SocketAddr::new(local_ip, config.bind_addr.port());
    info!(
        manifest_url = %format!("https://{public_addr}{}", config.routes.manifest),
        "Manifest endpoint available"
    );
    server::serve(listener, acceptor, app, shutdown).await
}
