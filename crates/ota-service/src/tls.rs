//! TLS server configuration from PEM files

use rustls::ServerConfig;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};

fn tls_error(path: &Path, reason: impl std::fmt::Display) -> ServiceError {
    ServiceError::Tls {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Read every certificate in a PEM chain
pub fn load_certificates(path: &Path) -> ServiceResult<Vec<CertificateDer<'static>>> {
    let certs = CertificateDer::pem_file_iter(path)
        .map_err(|e| tls_error(path, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| tls_error(path, e))?;
    if certs.is_empty() {
        return Err(tls_error(path, "no certificates found"));
    }
    Ok(certs)
}

/// Read the first private key (PKCS#8, PKCS#1 or SEC1) from a PEM file
pub fn load_private_key(path: &Path) -> ServiceResult<PrivateKeyDer<'static>> {
    PrivateKeyDer::from_pem_file(path).map_err(|e| tls_error(path, e))
}

/// Server-side TLS configuration without client authentication
///
/// Advertises HTTP/2 and HTTP/1.1 through ALPN.
pub fn load_server_config(cert_path: &Path, key_path: &Path) -> ServiceResult<Arc<ServerConfig>> {
    let certs = load_certificates(cert_path)?;
    let key = load_private_key(key_path)?;
    let chain_len = certs.len();

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| tls_error(cert_path, e))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| tls_error(key_path, e))?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    info!(cert = ?cert_path, chain_len, "Loaded TLS certificate");
    Ok(Arc::new(config))
}
