//! sftp-bridge library
//!
//! Read-only HTTP gateway onto a directory tree on a remote SFTP server.
//! Exposed as a library so integration tests can drive the handlers with
//! in-memory sessions.

pub mod bridge;
pub mod config;
pub mod error;
pub mod logging;
pub mod security_log;
pub mod server;
pub mod sftp;
pub mod ssh;
pub mod validation;
