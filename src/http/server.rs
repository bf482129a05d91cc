//! Listener lifecycle
//!
//! Connections are served one hyper HTTP/1 connection per task so each can
//! carry a header read timeout: a peer that stalls mid-request is dropped
//! instead of holding a socket open.

use axum::Router;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::{EdgeCamError, Result};

/// Bind the HTTP listener on all interfaces
pub async fn bind(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    TcpListener::bind(addr).await.map_err(|source| EdgeCamError::Bind { port, source })
}

/// Serve `router` until `shutdown` is cancelled
///
/// Clients must deliver their request headers within `recv_timeout`. On
/// shutdown open connections finish their current response, then close.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    recv_timeout: Duration,
    shutdown: CancellationToken,
) -> Result<()> {
    let local = listener.local_addr().map_err(|source| EdgeCamError::Server { source })?;
    info!(%local, ?recv_timeout, "HTTP server listening");

    let mut builder = http1::Builder::new();
    builder.timer(TokioTimer::new()).header_read_timeout(recv_timeout);

    let connections = TaskTracker::new();
    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            },
        };

        let service = TowerToHyperService::new(router.clone());
        let conn = builder.serve_connection(TokioIo::new(stream), service);
        let shutdown = shutdown.clone();
        connections.spawn(async move {
            tokio::pin!(conn);
            let result = tokio::select! {
                result = conn.as_mut() => result,
                _ = shutdown.cancelled() => {
                    conn.as_mut().graceful_shutdown();
                    conn.await
                }
            };
            if let Err(e) = result {
                debug!(%peer, "Connection closed: {}", e);
            }
        });
    }

    connections.close();
    connections.wait().await;
    info!("HTTP server stopped");
    Ok(())
}
