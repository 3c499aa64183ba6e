//! Security event logging for audit trails.
//!
//! The bridge exposes a whole remote home directory, so authentication,
//! session lifetime, host key decisions and denied paths are logged with
//! `target: "security"` to allow filtering in production.
//!
//! # Example
//!
//! Filter security events only:
//! ```bash
//! RUST_LOG=security=info sftp-bridge
//! ```

use tracing::{info, warn};

/// Log an SSH authentication attempt.
///
/// Called before attempting to authenticate with the remote host.
pub fn log_auth_attempt(host: &str, port: u16, username: &str, method: &str) {
    info!(
        target: "security",
        event = "auth_attempt",
        host = %host,
        port = port,
        username = %username,
        method = %method,
        "SSH authentication attempt"
    );
}

/// Log a successful SSH authentication.
pub fn log_auth_success(host: &str, port: u16, username: &str, method: &str) {
    info!(
        target: "security",
        event = "auth_success",
        host = %host,
        port = port,
        username = %username,
        method = %method,
        "SSH authentication succeeded"
    );
}

/// Log a failed SSH authentication attempt.
pub fn log_auth_failure(host: &str, port: u16, username: &str, method: &str, reason: &str) {
    warn!(
        target: "security",
        event = "auth_failure",
        host = %host,
        port = port,
        username = %username,
        method = %method,
        reason = %reason,
        "SSH authentication failed"
    );
}

/// Log an SFTP session establishment.
pub fn log_sftp_connect(host: &str, port: u16, username: &str) {
    info!(
        target: "security",
        event = "sftp_connect",
        host = %host,
        port = port,
        username = %username,
        "SFTP session established"
    );
}

/// Log the teardown of an SFTP session.
pub fn log_sftp_disconnect(host: &str, port: u16, clean: bool) {
    info!(
        target: "security",
        event = "sftp_disconnect",
        host = %host,
        port = port,
        clean = clean,
        "SFTP session closed"
    );
}

/// Log a request path rejected before any remote call.
pub fn log_path_denied(path: &str, reason: &str) {
    warn!(
        target: "security",
        event = "path_denied",
        path = %path,
        reason = %reason,
        "Request path denied"
    );
}

/// Log a host key that is not in known_hosts.
pub fn log_host_key_unknown(host: &str, port: u16, fingerprint: &str, accepted: bool) {
    warn!(
        target: "security",
        event = "host_key_unknown",
        host = %host,
        port = port,
        fingerprint = %fingerprint,
        accepted = accepted,
        "Remote host key not found in known_hosts"
    );
}

/// Log a host key that was rejected because it changed or was revoked.
pub fn log_host_key_rejected(host: &str, port: u16, reason: &str) {
    warn!(
        target: "security",
        event = "host_key_rejected",
        host = %host,
        port = port,
        reason = %reason,
        "Remote host key rejected"
    );
}
