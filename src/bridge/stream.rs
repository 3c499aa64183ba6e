//! File download responses.
//!
//! The body length comes from the open handle's size, and reads are bounded
//! by it. The remote side is never asked for data past the last byte, so a
//! server that does not report EOF cannot stall the transfer.

use std::io;

use axum::body::{Body, Bytes};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::bridge::resolver::RemotePath;
use crate::error::{BridgeError, SftpError};
use crate::sftp::{RemoteFile, RemoteSession, SessionGuard};

pub const OCTET_STREAM: &str = "application/octet-stream";

/// File handle and session owned by one download
struct Transfer<S: RemoteSession> {
    file: Option<S::File>,
    guard: Option<SessionGuard<S>>,
}

impl<S: RemoteSession> Transfer<S> {
    async fn finish(&mut self) {
        if let Some(file) = self.file.take() {
            file.close().await;
        }
        if let Some(guard) = self.guard.take() {
            guard.release().await;
        }
    }
}

/// Open `path` and stream it back as the response body.
///
/// Takes ownership of the session. It is released once the body has ended,
/// on any failure, or when the body is dropped early.
pub async fn stream_file<S: RemoteSession>(
    guard: SessionGuard<S>,
    path: &RemotePath,
    chunk_size: usize,
) -> Result<Response, BridgeError> {
    let mut file = match guard.session().open(path.as_str()).await {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!("Failed to open {}: {}", path, e);
            guard.release().await;
            return Err(open_error(e));
        }
    };

    let size = match file.size().await {
        Ok(size) => size,
        Err(e) => {
            tracing::warn!("Failed to stat open handle for {}: {}", path, e);
            file.close().await;
            guard.release().await;
            return Err(BridgeError::Internal(e.to_string()));
        }
    };

    tracing::debug!("Streaming {} ({} bytes)", path, size);

    let transfer = Transfer {
        file: Some(file),
        guard: Some(guard),
    };
    let body = Body::from_stream(body_stream(transfer, path.to_string(), size, chunk_size));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM)),
            (header::CONTENT_LENGTH, HeaderValue::from(size)),
        ],
        body,
    )
        .into_response())
}

fn body_stream<S: RemoteSession>(
    mut transfer: Transfer<S>,
    path: String,
    size: u64,
    chunk_size: usize,
) -> impl futures::Stream<Item = io::Result<Bytes>> + Send + 'static {
    async_stream::stream! {
        let mut buf = vec![0u8; chunk_size.max(1)];
        let mut remaining = size;

        while remaining > 0 {
            let want = remaining.min(buf.len() as u64) as usize;
            let read = match transfer.file.as_mut() {
                Some(file) => file.read(&mut buf[..want]).await,
                None => break,
            };

            match read {
                Ok(0) => {
                    let sent = size - remaining;
                    tracing::warn!(
                        "Remote file {} ended after {} of {} bytes",
                        path, sent, size
                    );
                    transfer.finish().await;
                    yield Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("ended after {} of {} bytes", sent, size),
                    ));
                    break;
                }
                Ok(n) => {
                    let n = n.min(want);
                    remaining -= n as u64;
                    let chunk = Bytes::copy_from_slice(&buf[..n]);
                    if remaining == 0 {
                        transfer.finish().await;
                        tracing::debug!("Finished streaming {} ({} bytes)", path, size);
                    }
                    yield Ok(chunk);
                }
                Err(e) => {
                    tracing::warn!(
                        "Read failed for {} after {} of {} bytes: {}",
                        path, size - remaining, size, e
                    );
                    transfer.finish().await;
                    yield Err(e);
                    break;
                }
            }
        }

        // empty files never enter the loop
        transfer.finish().await;
    }
}

fn open_error(error: SftpError) -> BridgeError {
    match error {
        SftpError::NotFound(msg) => BridgeError::NotFound(msg),
        other => BridgeError::Internal(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_files_are_not_found() {
        let missing = open_error(SftpError::NotFound("no such file".into()));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let denied = open_error(SftpError::FileOperation("permission denied".into()));
        assert_eq!(denied.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let slow = open_error(SftpError::Timeout("open".into()));
        assert_eq!(slow.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
