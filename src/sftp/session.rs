//! Per-request SFTP sessions
//!
//! The bridge talks to the remote side through [`RemoteSession`] so the
//! dispatch and streaming logic can run against in-memory fakes in tests.
//! [`SftpSession`] is the russh-backed implementation.

use std::future::Future;

use russh::Disconnect;
use russh::client::Handle;
use russh_sftp::client::SftpSession as RusshSftpSession;
use russh_sftp::client::error::Error as RusshSftpError;
use russh_sftp::client::fs::File as RusshFile;
use russh_sftp::protocol::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::SftpError;
use crate::security_log;
use crate::ssh::ClientHandler;

/// Result of a single stat call, taken once per request before dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatInfo {
    pub is_dir: bool,
    pub size: u64,
}

/// An open remote file.
///
/// `read` is not trusted to report end of file; callers bound their reads
/// by [`RemoteFile::size`].
pub trait RemoteFile: Send + 'static {
    /// Size of the open handle (fstat)
    fn size(&mut self) -> impl Future<Output = Result<u64, SftpError>> + Send;

    /// Read up to `buf.len()` bytes, returning how many were read
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = std::io::Result<usize>> + Send;

    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Operations the bridge needs from one authenticated session
pub trait RemoteSession: Send + Sync + 'static {
    type File: RemoteFile;

    /// Stat a path, following symlinks
    fn stat(&self, path: &str) -> impl Future<Output = Result<StatInfo, SftpError>> + Send;

    fn open(&self, path: &str) -> impl Future<Output = Result<Self::File, SftpError>> + Send;

    /// Entry names in server order, without `.` and `..`
    fn read_dir(&self, path: &str) -> impl Future<Output = Result<Vec<String>, SftpError>> + Send;

    /// Release the SFTP client and the transport beneath it. Idempotent.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Opens a fresh session for each request
pub trait SessionFactory: Send + Sync + 'static {
    type Session: RemoteSession;

    fn open_session(&self) -> impl Future<Output = Result<Self::Session, SftpError>> + Send;
}

/// Owns a request's session and closes it exactly once.
///
/// The normal path is [`SessionGuard::release`]. If the guard is dropped
/// instead (the client went away and the handler future or body stream was
/// dropped), the close is spawned onto the current runtime.
pub struct SessionGuard<S: RemoteSession> {
    session: Option<S>,
}

impl<S: RemoteSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn session(&self) -> &S {
        // only `release` and `drop` take the session, and both consume the guard
        self.session
            .as_ref()
            .unwrap_or_else(|| unreachable!("session released while guard alive"))
    }

    pub async fn release(mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
    }
}

impl<S: RemoteSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                rt.spawn(async move {
                    session.close().await;
                    tracing::debug!("Session closed after request was abandoned");
                });
            }
            Err(_) => {
                tracing::debug!("Session dropped without a Tokio runtime; close skipped");
            }
        }
    }
}

/// russh-backed session: one SSH connection carrying one SFTP subsystem
pub struct SftpSession {
    sftp: Mutex<RusshSftpSession>,
    handle: Mutex<Handle<ClientHandler>>,
    host: String,
    port: u16,
    closed: bool,
}

impl std::fmt::Debug for SftpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpSession")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl SftpSession {
    pub fn new(
        sftp: RusshSftpSession,
        handle: Handle<ClientHandler>,
        host: String,
        port: u16,
    ) -> Self {
        Self {
            sftp: Mutex::new(sftp),
            handle: Mutex::new(handle),
            host,
            port,
            closed: false,
        }
    }
}

impl RemoteSession for SftpSession {
    type File = SftpFile;

    async fn stat(&self, path: &str) -> Result<StatInfo, SftpError> {
        let sftp = self.sftp.lock().await;
        let metadata = sftp
            .metadata(path.to_string())
            .await
            .map_err(|e| map_remote_error(path, e))?;

        Ok(StatInfo {
            is_dir: metadata.is_dir(),
            size: metadata.size.unwrap_or(0),
        })
    }

    async fn open(&self, path: &str) -> Result<SftpFile, SftpError> {
        let sftp = self.sftp.lock().await;
        let file = sftp
            .open(path.to_string())
            .await
            .map_err(|e| map_remote_error(path, e))?;

        Ok(SftpFile {
            file,
            path: path.to_string(),
        })
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<String>, SftpError> {
        let sftp = self.sftp.lock().await;
        let read_dir = sftp
            .read_dir(path.to_string())
            .await
            .map_err(|e| map_remote_error(path, e))?;

        Ok(read_dir
            .map(|entry| entry.file_name())
            .filter(|name| name != "." && name != "..")
            .collect())
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let mut clean = true;
        if let Err(e) = self.sftp.get_mut().close().await {
            tracing::debug!("SFTP close failed for {}:{}: {}", self.host, self.port, e);
            clean = false;
        }
        if let Err(e) = self
            .handle
            .get_mut()
            .disconnect(Disconnect::ByApplication, "request complete", "en")
            .await
        {
            tracing::debug!("SSH disconnect failed for {}:{}: {}", self.host, self.port, e);
            clean = false;
        }

        security_log::log_sftp_disconnect(&self.host, self.port, clean);
    }
}

/// Open remote file handle
pub struct SftpFile {
    file: RusshFile,
    path: String,
}

impl RemoteFile for SftpFile {
    async fn size(&mut self) -> Result<u64, SftpError> {
        let metadata = self
            .file
            .metadata()
            .await
            .map_err(|e| map_remote_error(&self.path, e))?;
        Ok(metadata.size.unwrap_or(0))
    }

    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf).await
    }

    async fn close(mut self) {
        if let Err(e) = self.file.shutdown().await {
            tracing::debug!("Failed to close remote file {}: {}", self.path, e);
        }
    }
}

/// Map a russh-sftp failure, keeping the server's message for the client.
///
/// The remote path goes to the log only; the returned text reaches clients.
fn map_remote_error(path: &str, error: RusshSftpError) -> SftpError {
    tracing::debug!("SFTP operation on {} failed: {}", path, error);
    match error {
        RusshSftpError::Status(status) if status.status_code == StatusCode::NoSuchFile => {
            SftpError::NotFound(status.error_message)
        }
        RusshSftpError::Timeout => SftpError::Timeout("SFTP request".to_string()),
        other => SftpError::FileOperation(other.to_string()),
    }
}
