//! Read-only known_hosts verification.
//!
//! The bridge runs unattended, so there is nobody to confirm a new key and
//! nothing is ever written back; the file is only consulted.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use data_encoding::BASE64_MIME;
use hmac::{Hmac, Mac};
use russh::keys::{self, HashAlg, PublicKey};
use sha1::Sha1;

use crate::config::paths;

/// Result of checking a host key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKeyStatus {
    /// Key matches a stored key
    Known,
    /// No usable entry for this host
    Unknown { fingerprint: String },
    /// Host has a stored key of the same algorithm that differs (potential MITM)
    Changed {
        old_fingerprint: String,
        new_fingerprint: String,
    },
    /// Key matches a revoked entry
    Revoked { fingerprint: String },
}

/// Keys collected for one host across all known_hosts files
#[derive(Default)]
struct HostKeys {
    trusted: Vec<PublicKey>,
    revoked: Vec<PublicKey>,
}

/// known_hosts files consulted in order
#[derive(Debug, Clone, Default)]
pub struct KnownHosts {
    files: Vec<PathBuf>,
}

impl KnownHosts {
    /// Use the invoking user's `~/.ssh/known_hosts`
    pub fn from_default() -> Self {
        Self::with_files(paths::ssh_known_hosts_file().into_iter().collect())
    }

    pub fn with_files(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    pub fn fingerprint(key: &PublicKey) -> String {
        key.fingerprint(HashAlg::Sha256).to_string()
    }

    /// Check a host key presented by `host:port`
    pub fn check(&self, host: &str, port: u16, key: &PublicKey) -> HostKeyStatus {
        let stored = self.collect(host, port);
        let fingerprint = Self::fingerprint(key);

        if stored.revoked.iter().any(|revoked| revoked == key) {
            return HostKeyStatus::Revoked { fingerprint };
        }

        if stored.trusted.iter().any(|known| known == key) {
            return HostKeyStatus::Known;
        }

        match stored
            .trusted
            .iter()
            .find(|known| known.algorithm() == key.algorithm())
        {
            Some(old_key) => HostKeyStatus::Changed {
                old_fingerprint: Self::fingerprint(old_key),
                new_fingerprint: fingerprint,
            },
            None => HostKeyStatus::Unknown { fingerprint },
        }
    }

    fn collect(&self, host: &str, port: u16) -> HostKeys {
        let host_port = if port == 22 {
            Cow::Borrowed(host)
        } else {
            Cow::Owned(format!("[{}]:{}", host, port))
        };

        let mut keys = HostKeys::default();
        for path in &self.files {
            match std::fs::read_to_string(path) {
                Ok(content) => scan_file(path, &content, host, &host_port, &mut keys),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::debug!("Failed to read known_hosts {}: {}", path.display(), e);
                }
            }
        }
        keys
    }
}

fn scan_file(path: &Path, content: &str, host: &str, host_port: &str, keys: &mut HostKeys) {
    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (marker, rest) = match trimmed.strip_prefix('@') {
            Some(stripped) => match stripped.split_once(' ') {
                Some((marker, rest)) => (Some(marker), rest.trim_start()),
                None => continue,
            },
            None => (None, trimmed),
        };

        let mut fields = rest.split_whitespace();
        let (Some(hosts_field), Some(_key_type), Some(key_data)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };

        if !host_matches(hosts_field, host, host_port) {
            continue;
        }

        let key = match keys::parse_public_key_base64(key_data) {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!(
                    "Skipping unparsable key in {} line {}: {}",
                    path.display(),
                    index + 1,
                    e
                );
                continue;
            }
        };

        match marker {
            None => keys.trusted.push(key),
            Some("revoked") => keys.revoked.push(key),
            // cert-authority and unknown markers do not vouch for a plain key
            Some(_) => {}
        }
    }
}

/// Comma-separated patterns; a matching `!pattern` vetoes the whole line.
fn host_matches(hosts_field: &str, host: &str, host_port: &str) -> bool {
    let mut matched = false;

    for entry in hosts_field.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (negated, pattern) = match entry.strip_prefix('!') {
            Some(pattern) => (true, pattern),
            None => (false, entry),
        };

        let is_match = if pattern.starts_with("|1|") {
            hashed_host_matches(pattern, host_port)
        } else if pattern.contains('*') || pattern.contains('?') {
            glob_match(pattern, host) || glob_match(pattern, host_port)
        } else {
            pattern == host || pattern == host_port
        };

        if is_match && negated {
            return false;
        }
        matched |= is_match && !negated;
    }

    matched
}

/// `|1|base64(salt)|base64(hmac_sha1(salt, host))`
fn hashed_host_matches(pattern: &str, host_port: &str) -> bool {
    let mut parts = pattern.split('|').skip(2);
    let (Some(salt), Some(hash)) = (parts.next(), parts.next()) else {
        return false;
    };

    let (Ok(salt), Ok(hash)) = (
        BASE64_MIME.decode(salt.as_bytes()),
        BASE64_MIME.decode(hash.as_bytes()),
    ) else {
        return false;
    };

    let Ok(mut mac) = Hmac::<Sha1>::new_from_slice(&salt) else {
        return false;
    };
    mac.update(host_port.as_bytes());
    mac.verify_slice(&hash).is_ok()
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let (p, t) = (pattern.as_bytes(), text.as_bytes());
    let (mut p_idx, mut t_idx) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while t_idx < t.len() {
        if p_idx < p.len() && (p[p_idx] == b'?' || p[p_idx] == t[t_idx]) {
            p_idx += 1;
            t_idx += 1;
        } else if p_idx < p.len() && p[p_idx] == b'*' {
            backtrack = Some((p_idx, t_idx));
            p_idx += 1;
        } else if let Some((star, matched)) = backtrack {
            p_idx = star + 1;
            t_idx = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    p[p_idx..].iter().all(|&c| c == b'*')
}
