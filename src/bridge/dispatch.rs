//! Per-request dispatch: resolve, open a session, stat, then list or stream.

use axum::response::{IntoResponse, Response};

use crate::bridge::listing::{directory_response, render_directory};
use crate::bridge::resolver::{PathResolver, RemotePath, Resolution};
use crate::bridge::stream::stream_file;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, SftpError};
use crate::security_log;
use crate::sftp::{RemoteSession, SessionFactory, SessionGuard};

/// Shared, immutable request handler state
#[derive(Debug)]
pub struct Bridge<F: SessionFactory> {
    resolver: PathResolver,
    factory: F,
    chunk_size: usize,
}

impl<F: SessionFactory> Bridge<F> {
    pub fn new(resolver: PathResolver, factory: F, chunk_size: usize) -> Self {
        Self {
            resolver,
            factory,
            chunk_size,
        }
    }

    pub fn from_config(config: &BridgeConfig, factory: F) -> Self {
        Self::new(
            PathResolver::new(&config.remote.root),
            factory,
            config.stream.chunk_size,
        )
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Serve one request path (already percent-decoded).
    pub async fn handle(&self, request_path: &str) -> Response {
        match self.dispatch(request_path).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("{} -> {}: {}", request_path, e.status(), e);
                e.into_response()
            }
        }
    }

    async fn dispatch(&self, request_path: &str) -> Result<Response, BridgeError> {
        let path = match self.resolver.resolve(request_path) {
            Resolution::Allowed(path) => path,
            Resolution::Denied(reason) => {
                security_log::log_path_denied(request_path, reason);
                return Err(BridgeError::Denied(reason));
            }
        };

        let session = self.factory.open_session().await.map_err(|e| {
            tracing::error!("Failed to open SFTP session for {}: {}", path, e);
            BridgeError::from(e)
        })?;
        let guard = SessionGuard::new(session);

        let stat = match guard.session().stat(path.as_str()).await {
            Ok(stat) => stat,
            Err(e) => {
                guard.release().await;
                return Err(BridgeError::NotFound(remote_text(e)));
            }
        };

        if stat.is_dir {
            list_directory(guard, &path).await
        } else {
            stream_file(guard, &path, self.chunk_size).await
        }
    }
}

async fn list_directory<S: RemoteSession>(
    guard: SessionGuard<S>,
    path: &RemotePath,
) -> Result<Response, BridgeError> {
    let listing = guard.session().read_dir(path.as_str()).await;
    guard.release().await;

    let entries = listing.map_err(|e| {
        tracing::warn!("Failed to list {}: {}", path, e);
        BridgeError::Internal(e.to_string())
    })?;

    tracing::debug!("Listing {} ({} entries)", path, entries.len());
    Ok(directory_response(render_directory(&entries)))
}

/// The server's own message where there is one
fn remote_text(error: SftpError) -> String {
    match error {
        SftpError::NotFound(msg) => msg,
        other => other.to_string(),
    }
}
