//! Validation for configuration values read at startup.
//!
//! Every check runs before the listener binds, so a bad value stops the
//! process instead of failing each request.

use std::net::IpAddr;

use regex::Regex;
use std::sync::LazyLock;

/// Validation error with field context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

// Pre-compiled regex patterns for validation
static DNS_LABEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?$").unwrap());

static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_-]{0,31}$").unwrap());

/// Validate the remote hostname (DNS name or IP address).
///
/// # Errors
///
/// Returns `ValidationError` if the hostname is empty, too long, or malformed.
pub fn validate_hostname(hostname: &str) -> Result<(), ValidationError> {
    let hostname = hostname.trim();

    if hostname.is_empty() {
        return Err(ValidationError::new("remote.host", "Hostname is required"));
    }

    // DNS max is 253 characters
    if hostname.len() > 253 {
        return Err(ValidationError::new(
            "remote.host",
            "Hostname exceeds maximum length of 253 characters",
        ));
    }

    if hostname.parse::<IpAddr>().is_ok() {
        return Ok(());
    }

    for label in hostname.split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(ValidationError::new(
                "remote.host",
                "Hostname labels must be 1-63 characters",
            ));
        }

        if !DNS_LABEL_REGEX.is_match(label) {
            return Err(ValidationError::new(
                "remote.host",
                format!(
                    "Invalid hostname label '{}': must start and end with alphanumeric, may contain hyphens",
                    label
                ),
            ));
        }
    }

    Ok(())
}

/// Parse a port number string, as found in `$PORT`.
///
/// # Errors
///
/// Returns `ValidationError` if the port is not a valid number in range 1-65535.
pub fn validate_port(port_str: &str) -> Result<u16, ValidationError> {
    let port_str = port_str.trim();

    if port_str.is_empty() {
        return Err(ValidationError::new("port", "Port is required"));
    }

    match port_str.parse::<u16>() {
        Ok(port) if port >= 1 => Ok(port),
        Ok(_) => Err(ValidationError::new("port", "Port must be between 1 and 65535")),
        Err(_) => Err(ValidationError::new(
            "port",
            format!("Invalid port number: '{}'", port_str),
        )),
    }
}

/// Validate the remote SSH username.
///
/// Unlike an interactive client there is no "current user" fallback, so the
/// name is required. It must follow POSIX conventions and be at most 32
/// characters.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ValidationError::new("remote.username", "Username is required"));
    }

    if username.len() > 32 {
        return Err(ValidationError::new(
            "remote.username",
            "Username exceeds maximum length of 32 characters",
        ));
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(ValidationError::new(
            "remote.username",
            "Username must start with letter or underscore, and contain only alphanumeric, underscore, or hyphen",
        ));
    }

    Ok(())
}

/// Validate the remote root every request path is joined onto.
pub fn validate_remote_root(root: &str) -> Result<(), ValidationError> {
    if !root.starts_with('/') {
        return Err(ValidationError::new(
            "remote.root",
            "Remote root must be an absolute path",
        ));
    }

    if root.split('/').any(|segment| segment == "..") {
        return Err(ValidationError::new(
            "remote.root",
            "Remote root must not contain '..' segments",
        ));
    }

    Ok(())
}

/// Validate the HTTP bind address.
///
/// The bridge can read the entire remote home directory, so it must only be
/// reachable from the local host or a private network segment (such as the
/// docker bridge). Unspecified and public addresses are refused.
pub fn validate_bind_address(addr: IpAddr) -> Result<(), ValidationError> {
    let internal = match addr {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unique_local() || v6.is_unicast_link_local(),
    };

    if internal {
        Ok(())
    } else {
        Err(ValidationError::new(
            "listen.address",
            format!(
                "{} is not a loopback or private address; refusing to expose the remote filesystem",
                addr
            ),
        ))
    }
}
