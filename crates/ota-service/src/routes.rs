//! HTTP routes of the distribution endpoint
//!
//! The router only ever reads: the manifest is rebuilt from the artifact on
//! disk for every request (through the digest cache) and the artifact is
//! streamed back verbatim. Missing artifacts and read failures answer 404 so
//! discovery probes keep working before the first build is published.

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use ota_manifest::{ManifestBuilder, ManifestCache};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::RouteConfig;

/// Shared, read-only request state
#[derive(Debug, Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    artifact_path: PathBuf,
    builder: ManifestBuilder,
    cache: ManifestCache,
}

impl AppState {
    /// State serving `artifact_path` with manifests from `builder`
    pub fn new(artifact_path: PathBuf, builder: ManifestBuilder) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                artifact_path,
                builder,
                cache: ManifestCache::new(),
            }),
        }
    }

    /// Path of the served container
    pub fn artifact_path(&self) -> &std::path::Path {
        &self.inner.artifact_path
    }

    /// Digest cache
    pub fn cache(&self) -> &ManifestCache {
        &self.inner.cache
    }
}

/// Build the router for `routes`
pub fn router(state: AppState, routes: &RouteConfig) -> Router {
    Router::new()
        .route(
            &routes.manifest,
            get(manifest_handler).fallback(not_found_handler),
        )
        .route(
            &routes.firmware,
            get(firmware_handler).fallback(not_found_handler),
        )
        .fallback(not_found_handler)
        .with_state(state)
}

async fn manifest_handler(State(state): State<AppState>) -> Response {
    let inner = &state.inner;
    match inner
        .builder
        .build_cached(&inner.cache, &inner.artifact_path)
        .await
    {
        Ok(manifest) => {
            debug!(size = manifest.size, sha256 = %manifest.sha256, "Serving manifest");
            (StatusCode::OK, Json(manifest)).into_response()
        }
        Err(e) => {
            if e.is_not_found() {
                debug!(path = ?inner.artifact_path, "No artifact, serving placeholder manifest");
            } else {
                warn!(path = ?inner.artifact_path, error = %e, "Failed to build manifest");
            }
            (StatusCode::NOT_FOUND, Json(inner.builder.placeholder())).into_response()
        }
    }
}

async fn firmware_handler(State(state): State<AppState>) -> Response {
    let path = &state.inner.artifact_path;
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            debug!(path = ?path, size = bytes.len(), "Serving firmware container");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                    (header::CONTENT_LENGTH, bytes.len().to_string()),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) => {
            if e.kind() == std::io::ErrorKind::NotFound {
                debug!(path = ?path, "Firmware container not found");
            } else {
                warn!(path = ?path, error = %e, "Failed to read firmware container");
            }
            (StatusCode::NOT_FOUND, "Firmware not found").into_response()
        }
    }
}

async fn not_found_handler() -> Response {
    (StatusCode::NOT_FOUND, "File not found").into_response()
}
