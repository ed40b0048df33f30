//! Service configuration
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! `OTA_*` environment variables, then command-line flags. [`ServiceConfig::validate`]
//! runs once after all layers are applied.

use ota_container::{ContainerScheme, DEFAULT_KEY_ENV};
use ota_manifest::ManifestTemplate;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

use crate::error::{ServiceError, ServiceResult};

/// Default listen port
pub const DEFAULT_PORT: u16 = 8443;

/// Complete daemon configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Address the TLS listener binds to
    pub bind_addr: SocketAddr,
    /// Certificate and private key
    pub tls: TlsConfig,
    /// Container served at the firmware route
    pub artifact_path: PathBuf,
    /// Request paths
    pub routes: RouteConfig,
    /// Release metadata copied into every manifest
    pub release: ReleaseConfig,
    /// Base URL devices use to reach this server; detected when unset
    pub public_base_url: Option<String>,
    /// Optional container publication at startup
    pub publish: PublishConfig,
    /// Log output
    pub logging: LogSettings,
}

/// PEM files for the TLS listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Certificate chain (PEM)
    pub cert_path: PathBuf,
    /// Private key (PEM)
    pub key_path: PathBuf,
}

/// Request paths of the two endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Manifest route
    pub manifest: String,
    /// Container route
    pub firmware: String,
}

/// Release fields of the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Release version (semver)
    pub version: String,
    /// Lowest eligible device version (semver)
    pub min_version: String,
    /// Free-text description
    pub description: String,
}

/// Encrypt a plaintext image into the artifact path before serving
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Plaintext firmware image; publication is skipped when unset
    pub source_image: Option<PathBuf>,
    /// Container scheme the device decryptor is built for
    pub scheme: ContainerScheme,
    /// Environment variable holding the hex key
    pub key_env: String,
    /// Key file, preferred over `key_env` when set
    pub key_file: Option<PathBuf>,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Level filter (`RUST_LOG` takes precedence)
    pub level: String,
    /// Emit JSON lines
    pub json: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            tls: TlsConfig::default(),
            artifact_path: PathBuf::from("firmware.bin"),
            routes: RouteConfig::default(),
            release: ReleaseConfig::default(),
            public_base_url: None,
            publish: PublishConfig::default(),
            logging: LogSettings::default(),
        }
    }
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from("server.crt"),
            key_path: PathBuf::from("server.key"),
        }
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            manifest: "/manifest.json".to_string(),
            firmware: "/firmware.bin".to_string(),
        }
    }
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            version: "2.0.0".to_string(),
            min_version: "1.0.0".to_string(),
            description: "Local OTA update".to_string(),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            source_image: None,
            scheme: ContainerScheme::CbcSizePrefixed,
            key_env: DEFAULT_KEY_ENV.to_string(),
            key_file: None,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a JSON file
    pub async fn load_from_path(path: &Path) -> ServiceResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ServiceError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: ServiceConfig = serde_json::from_str(&content)?;
        debug!(path = ?path, "Loaded service config");
        Ok(config)
    }

    /// Defaults, overlaid with `path` when given, then with the process
    /// environment
    pub async fn load(path: Option<&Path>) -> ServiceResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_path(path).await?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Save configuration as pretty JSON (atomically)
    pub async fn save_to_path(&self, path: &Path) -> ServiceResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        ota_container::write_atomic(path, content.as_bytes()).await?;
        debug!(path = ?path, "Saved service config");
        Ok(())
    }

    /// Apply `OTA_*` variables from the process environment
    pub fn apply_env_overrides(&mut self) -> ServiceResult<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply `OTA_*` overrides from an arbitrary lookup
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `OTA_BIND` | `bind_addr` |
    /// | `OTA_TLS_CERT` / `OTA_TLS_KEY` | `tls` |
    /// | `OTA_ARTIFACT` | `artifact_path` |
    /// | `OTA_PUBLIC_BASE_URL` | `public_base_url` |
    /// | `OTA_VERSION` / `OTA_MIN_VERSION` / `OTA_DESCRIPTION` | `release` |
    /// | `OTA_SCHEME` | `publish.scheme` |
    /// | `OTA_LOG_LEVEL` / `OTA_LOG_JSON` | `logging` |
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> ServiceResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("OTA_BIND") {
            self.bind_addr = bind
                .parse()
                .map_err(|e| ServiceError::Config(format!("OTA_BIND '{bind}': {e}")))?;
        }
        if let Some(cert) = lookup("OTA_TLS_CERT") {
            self.tls.cert_path = PathBuf::from(cert);
        }
        if let Some(key) = lookup("OTA_TLS_KEY") {
            self.tls.key_path = PathBuf::from(key);
        }
        if let Some(artifact) = lookup("OTA_ARTIFACT") {
            self.artifact_path = PathBuf::from(artifact);
        }
        if let Some(base) = lookup("OTA_PUBLIC_BASE_URL") {
            self.public_base_url = Some(base);
        }
        if let Some(version) = lookup("OTA_VERSION") {
            self.release.version = version;
        }
        if let Some(min_version) = lookup("OTA_MIN_VERSION") {
            self.release.min_version = min_version;
        }
        if let Some(description) = lookup("OTA_DESCRIPTION") {
            self.release.description = description;
        }
        if let Some(scheme) = lookup("OTA_SCHEME") {
            self.publish.scheme = scheme.parse()?;
        }
        if let Some(level) = lookup("OTA_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("OTA_LOG_JSON") {
            self.logging.json = matches!(json.trim(), "1" | "true" | "yes");
        }
        Ok(())
    }

    /// Check the fully layered configuration
    pub fn validate(&self) -> ServiceResult<()> {
        for (name, route) in [
            ("manifest", &self.routes.manifest),
            ("firmware", &self.routes.firmware),
        ] {
            if route.len() < 2 || !route.starts_with('/') {
                return Err(ServiceError::Config(format!(
                    "{name} route must be an absolute path, got '{route}'"
                )));
            }
        }
        if self.routes.manifest == self.routes.firmware {
            return Err(ServiceError::Config(
                "manifest and firmware routes must differ".to_string(),
            ));
        }
        if self.artifact_path.as_os_str().is_empty() {
            return Err(ServiceError::Config("artifact path is empty".to_string()));
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ServiceError::Config(format!(
                "unknown log level '{}'",
                self.logging.level
            )));
        }
        if let Some(base) = &self.public_base_url {
            parse_base_url(base)?;
        }

        // Versions and URL are checked by building the template once.
        self.manifest_template(IpAddr::V4(Ipv4Addr::LOCALHOST))?;
        Ok(())
    }

    /// URL devices download the container from
    ///
    /// Uses `public_base_url` when configured, otherwise
    /// `https://{local_ip}:{port}{firmware_route}`.
    pub fn firmware_url(&self, local_ip: IpAddr) -> ServiceResult<Url> {
        let base = match &self.public_base_url {
            Some(base) => parse_base_url(base)?.to_string(),
            None => format!(
                "https://{}",
                SocketAddr::new(local_ip, self.bind_addr.port())
            ),
        };
        let joined = format!("{}{}", base.trim_end_matches('/'), self.routes.firmware);
        Url::parse(&joined)
            .map_err(|e| ServiceError::Config(format!("firmware URL '{joined}': {e}")))
    }

    /// Manifest template for this release
    pub fn manifest_template(&self, local_ip: IpAddr) -> ServiceResult<ManifestTemplate> {
        Ok(ManifestTemplate::from_parts(
            parse_version(&self.release.version)?,
            parse_version(&self.release.min_version)?,
            self.firmware_url(local_ip)?,
            self.release.description.clone(),
        )?)
    }
}

fn parse_version(value: &str) -> ServiceResult<semver::Version> {
    semver::Version::parse(value.trim())
        .map_err(|e| ServiceError::Config(format!("invalid version '{value}': {e}")))
}

fn parse_base_url(base: &str) -> ServiceResult<Url> {
    let url = Url::parse(base)
        .map_err(|e| ServiceError::Config(format!("public_base_url '{base}': {e}")))?;
    if !matches!(url.scheme(), "https" | "http") || url.host().is_none() {
        return Err(ServiceError::Config(format!(
            "public_base_url '{base}' must be an absolute http(s) URL"
        )));
    }
    Ok(url)
}

/// Address of the interface that routes to the outside world
///
/// Connecting a UDP socket sends no packets; it only makes the kernel pick a
/// source address. Falls back to loopback when there is no route.
pub fn detect_local_ip() -> IpAddr {
    let detected = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|socket| {
            socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
            socket.local_addr()
        })
        .map(|addr| addr.ip());

    match detected {
        Ok(ip) if !ip.is_unspecified() => {
            info!(%ip, "Detected local IP");
            ip
        }
        _ => {
            info!("No outbound route, using loopback for firmware URL");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}
