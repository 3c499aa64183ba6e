use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// SSH-related errors
#[derive(Error, Debug)]
pub enum SshError {
    #[error("Key file error: {0}")]
    KeyFile(String),

    #[error("Key file {0} is encrypted and needs a passphrase")]
    KeyFilePassphraseRequired(PathBuf),

    #[error("Wrong passphrase for key file {0}")]
    KeyFilePassphraseInvalid(PathBuf),

    #[error("Host key verification failed: {0}")]
    HostKeyVerification(String),

    #[error("russh error: {0}")]
    Russh(String),
}

impl From<russh::Error> for SshError {
    fn from(err: russh::Error) -> Self {
        SshError::Russh(err.to_string())
    }
}

/// SFTP-related errors
#[derive(Error, Debug)]
pub enum SftpError {
    #[error("SFTP connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("No such file: {0}")]
    NotFound(String),

    #[error("File operation failed: {0}")]
    FileOperation(String),
}

/// Per-request failures, each mapped to exactly one HTTP status.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("not an allowed path: {0}")]
    Denied(&'static str),

    #[error("{0}")]
    NotFound(String),

    #[error("remote unavailable: {0}")]
    Unavailable(String),

    #[error("remote timed out: {0}")]
    GatewayTimeout(String),

    #[error("{0}")]
    Internal(String),
}

impl BridgeError {
    pub fn status(&self) -> StatusCode {
        match self {
            BridgeError::Denied(_) => StatusCode::FORBIDDEN,
            BridgeError::NotFound(_) => StatusCode::NOT_FOUND,
            BridgeError::Unavailable(_) => StatusCode::BAD_GATEWAY,
            BridgeError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            BridgeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

impl From<SftpError> for BridgeError {
    fn from(error: SftpError) -> Self {
        match error {
            SftpError::ConnectionFailed(msg) => BridgeError::Unavailable(msg),
            SftpError::Timeout(msg) => BridgeError::GatewayTimeout(msg),
            SftpError::NotFound(msg) => BridgeError::NotFound(msg),
            other => BridgeError::Internal(other.to_string()),
        }
    }
}
