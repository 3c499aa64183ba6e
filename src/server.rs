//! HTTP surface: routing, request decoding and the listener loop.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{Request, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::bridge::Bridge;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::security_log;
use crate::sftp::SessionFactory;

pub fn router<F: SessionFactory>(bridge: Arc<Bridge<F>>) -> Router {
    Router::new()
        .route("/", get(get_path::<F>))
        .route("/{*path}", get(get_path::<F>))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::debug_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .with_state(bridge)
}

/// GET handler for every path
pub async fn get_path<F: SessionFactory>(
    State(bridge): State<Arc<Bridge<F>>>,
    uri: Uri,
) -> Response {
    let raw = uri.path();
    match urlencoding::decode(raw) {
        Ok(path) => bridge.handle(&path).await,
        Err(_) => {
            let reason = "path is not valid UTF-8";
            security_log::log_path_denied(raw, reason);
            BridgeError::Denied(reason).into_response()
        }
    }
}

/// Bind the configured address and serve until Ctrl-C or SIGTERM.
pub async fn serve<F: SessionFactory>(
    config: &BridgeConfig,
    bridge: Arc<Bridge<F>>,
) -> std::io::Result<()> {
    let addr = config.listen_addr();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        "Serving {}:{}{} on http://{}",
        config.remote.host,
        config.remote.port,
        config.remote.root,
        listener.local_addr()?
    );

    axum::serve(listener, router(bridge))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Received termination signal, shutting down");
}
