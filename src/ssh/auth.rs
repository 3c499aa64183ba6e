//! Private key loading for public key authentication.

use std::path::Path;
use std::sync::Arc;

use russh::keys::{HashAlg, PrivateKeyWithHashAlg};
use secrecy::{ExposeSecret, SecretString};

use crate::error::SshError;

/// Environment variable holding the passphrase of an encrypted key.
pub const PASSPHRASE_ENV: &str = "SFTP_BRIDGE_KEY_PASSPHRASE";

/// Signing material loaded once at startup and shared by every session.
#[derive(Clone)]
pub struct Credential {
    key: Arc<russh::keys::PrivateKey>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("algorithm", &self.key.algorithm().as_str())
            .field("key", &"[KEY]")
            .finish()
    }
}

impl Credential {
    /// Key paired with the hash algorithm used for signing.
    ///
    /// Only RSA keys use SHA-512; ED25519 and other keys use their native
    /// signing algorithms.
    pub fn signer(&self) -> PrivateKeyWithHashAlg {
        let hash_alg = if self.key.algorithm().is_rsa() {
            Some(HashAlg::Sha512)
        } else {
            None
        };
        PrivateKeyWithHashAlg::new(self.key.clone(), hash_alg)
    }

    pub fn algorithm(&self) -> String {
        self.key.algorithm().as_str().to_string()
    }
}

/// Read the passphrase from `$SFTP_BRIDGE_KEY_PASSPHRASE`, if set.
pub fn passphrase_from_env() -> Option<SecretString> {
    std::env::var(PASSPHRASE_ENV)
        .ok()
        .filter(|value| !value.is_empty())
        .map(SecretString::from)
}

/// Load an SSH private key from file.
///
/// The service cannot do anything without its key, so callers treat any
/// error here as fatal.
pub fn load_credential(
    path: &Path,
    passphrase: Option<&SecretString>,
) -> Result<Credential, SshError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SshError::KeyFile(format!("Cannot read key file {}: {}", path.display(), e))
    })?;

    // Check if this is actually a public key (common mistake)
    let first_line = content.lines().next().unwrap_or("");
    if first_line.starts_with("ssh-") || first_line.starts_with("ecdsa-") {
        return Err(SshError::KeyFile(format!(
            "File {} contains a PUBLIC key, not a private key",
            path.display()
        )));
    }

    if !first_line.starts_with("-----BEGIN") {
        return Err(SshError::KeyFile(format!(
            "File {} does not appear to be a valid SSH private key",
            path.display()
        )));
    }

    let passphrase = passphrase.map(|p| p.expose_secret());
    let key = russh::keys::decode_secret_key(&content, passphrase).map_err(|e| {
        let normalized = e.to_string().to_lowercase();
        // Detect passphrase-related errors from various russh error messages
        let is_passphrase_error = normalized.contains("encrypted")
            || normalized.contains("passphrase")
            || normalized.contains("cryptographic");
        if is_passphrase_error {
            if passphrase.is_some() {
                SshError::KeyFilePassphraseInvalid(path.to_path_buf())
            } else {
                SshError::KeyFilePassphraseRequired(path.to_path_buf())
            }
        } else {
            SshError::KeyFile(format!("Failed to load key {}: {}", path.display(), e))
        }
    })?;

    Ok(Credential { key: Arc::new(key) })
}
