//! SFTP sessions for the bridge
//!
//! One session per HTTP request; nothing is pooled or reused.

pub mod client;
pub mod session;

pub use client::SessionManager;
pub use session::{
    RemoteFile, RemoteSession, SessionFactory, SessionGuard, SftpFile, SftpSession, StatInfo,
};
