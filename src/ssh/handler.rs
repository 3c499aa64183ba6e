use std::future::Future;
use std::sync::Arc;

use russh::client::Handler;
use russh::keys::PublicKey;

use crate::error::SshError;
use crate::security_log;

use super::known_hosts::{HostKeyStatus, KnownHosts};

/// SSH client handler for unattended bridge sessions
pub struct ClientHandler {
    host: String,
    port: u16,
    known_hosts: Arc<KnownHosts>,
    strict: bool,
}

impl ClientHandler {
    pub fn new(host: String, port: u16, known_hosts: Arc<KnownHosts>, strict: bool) -> Self {
        Self {
            host,
            port,
            known_hosts,
            strict,
        }
    }
}

impl Handler for ClientHandler {
    type Error = SshError;

    fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        let host = self.host.clone();
        let port = self.port;
        let known_hosts = self.known_hosts.clone();
        let key = server_public_key.clone();
        let strict = self.strict;

        async move {
            let status = tokio::task::spawn_blocking({
                let host = host.clone();
                move || known_hosts.check(&host, port, &key)
            })
            .await
            .map_err(|e| SshError::HostKeyVerification(format!("Host key check failed: {}", e)))?;

            host_key_decision(&host, port, status, strict)
        }
    }
}

/// Map a known_hosts lookup to accept/reject without asking anyone.
fn host_key_decision(
    host: &str,
    port: u16,
    status: HostKeyStatus,
    strict: bool,
) -> Result<bool, SshError> {
    match status {
        HostKeyStatus::Known => {
            tracing::debug!("Host key verified for {}:{}", host, port);
            Ok(true)
        }
        HostKeyStatus::Unknown { fingerprint } => {
            security_log::log_host_key_unknown(host, port, &fingerprint, !strict);
            if strict {
                Err(SshError::HostKeyVerification(format!(
                    "Host key {} for {}:{} is not in known_hosts",
                    fingerprint, host, port
                )))
            } else {
                Ok(true)
            }
        }
        HostKeyStatus::Changed {
            old_fingerprint,
            new_fingerprint,
        } => {
            let reason = format!(
                "host key changed (old: {}, new: {})",
                old_fingerprint, new_fingerprint
            );
            security_log::log_host_key_rejected(host, port, &reason);
            Err(SshError::HostKeyVerification(format!(
                "HOST KEY CHANGED for {}:{}",
                host, port
            )))
        }
        HostKeyStatus::Revoked { fingerprint } => {
            security_log::log_host_key_rejected(host, port, "host key revoked");
            Err(SshError::HostKeyVerification(format!(
                "Host key {} has been revoked",
                fingerprint
            )))
        }
    }
}
