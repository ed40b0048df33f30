//! TLS accept loop
//!
//! Each accepted TCP connection gets its own task that performs the TLS
//! handshake and then drives HTTP/1.1 or HTTP/2 on it. A failed handshake or
//! a client that disconnects mid-transfer only ends that task.

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::error::{ServiceError, ServiceResult};

/// Bind the TCP listener for `addr`
pub async fn bind(addr: SocketAddr) -> ServiceResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServiceError::Bind { addr, source })
}

/// Accept connections on `listener` until `shutdown` resolves
///
/// In-flight connections are left to finish on their own tasks.
pub async fn serve<F>(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    app: Router,
    shutdown: F,
) -> ServiceResult<()>
where
    F: Future<Output = ()> + Send,
{
    let local_addr = listener.local_addr()?;
    info!(%local_addr, "Distribution endpoint listening");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("Shutdown requested, no longer accepting connections");
                return Ok(());
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let span = info_span!("connection", %peer);
                        tokio::spawn(
                            handle_connection(stream, acceptor.clone(), app.clone()).instrument(span),
                        );
                    }
                    Err(e) => {
                        // Per-connection accept errors (e.g. EMFILE) must not stop the server.
                        error!(error = %e, "Failed to accept connection");
                    }
                }
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, acceptor: TlsAcceptor, app: Router) {
    let tls = match acceptor.accept(stream).await {
        Ok(tls) => tls,
        Err(e) => {
            warn!(error = %e, "TLS handshake failed");
            return;
        }
    };
    debug!("TLS handshake complete");

    let service = TowerToHyperService::new(app);
    if let Err(e) = auto::Builder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(tls), service)
        .await
    {
        debug!(error = %e, "Connection closed with error");
    }
}
