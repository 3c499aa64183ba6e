//! SSH transport pieces used by the bridge
//!
//! Key loading, host key verification and the russh client handler.

pub mod auth;
pub mod handler;
pub mod known_hosts;

pub use auth::{Credential, load_credential};
pub use handler::ClientHandler;
pub use known_hosts::KnownHosts;
