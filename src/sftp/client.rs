//! SFTP client for establishing per-request sessions

use std::sync::Arc;
use std::time::Duration;

use russh::client::{self, Config};
use russh_sftp::client::SftpSession as RusshSftpSession;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::{BridgeConfig, RemoteConfig};
use crate::error::SftpError;
use crate::security_log;
use crate::ssh::handler::ClientHandler;
use crate::ssh::{Credential, KnownHosts};

use super::session::{SessionFactory, SftpSession};

/// Dials the remote host and hands out one fresh session per call
pub struct SessionManager {
    config: Arc<Config>,
    remote: RemoteConfig,
    credential: Credential,
    known_hosts: Arc<KnownHosts>,
    strict_host_key_checking: bool,
    connection_timeout: Duration,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("host", &self.remote.host)
            .field("port", &self.remote.port)
            .field("username", &self.remote.username)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(settings: &BridgeConfig, credential: Credential, known_hosts: KnownHosts) -> Self {
        // Treat 0 as "no keepalive" to avoid immediate timeout
        let keepalive = match settings.ssh.keepalive_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let config = Config {
            inactivity_timeout: Some(Duration::from_secs(3600)),
            keepalive_interval: keepalive,
            keepalive_max: 3,
            ..Default::default()
        };

        Self {
            config: Arc::new(config),
            remote: settings.remote.clone(),
            credential,
            known_hosts: Arc::new(known_hosts),
            strict_host_key_checking: settings.ssh.strict_host_key_checking,
            connection_timeout: settings.ssh.connection_timeout(),
        }
    }

    /// Connect to the remote host and establish an SFTP session
    pub async fn connect(&self) -> Result<SftpSession, SftpError> {
        let addr = format!("{}:{}", self.remote.host, self.remote.port);

        let stream = timeout(self.connection_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| SftpError::Timeout(format!("connecting to {}", addr)))?
            .map_err(|e| {
                SftpError::ConnectionFailed(format!("Failed to connect to {}: {}", addr, e))
            })?;

        // Wrap the rest of the connection process in a timeout
        match timeout(self.connection_timeout, self.establish_sftp_session(stream)).await {
            Ok(result) => result,
            Err(_) => Err(SftpError::Timeout(format!("SFTP session setup for {}", addr))),
        }
    }

    async fn establish_sftp_session(&self, stream: TcpStream) -> Result<SftpSession, SftpError> {
        let remote = &self.remote;
        let handler = ClientHandler::new(
            remote.host.clone(),
            remote.port,
            self.known_hosts.clone(),
            self.strict_host_key_checking,
        );

        let mut handle = client::connect_stream(self.config.clone(), stream, handler)
            .await
            .map_err(|e| {
                SftpError::ConnectionFailed(format!(
                    "SSH handshake failed for {}:{}: {}",
                    remote.host, remote.port, e
                ))
            })?;

        self.authenticate(&mut handle).await?;

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| SftpError::ConnectionFailed(format!("Failed to open channel: {}", e)))?;

        channel
            .request_subsystem(false, "sftp")
            .await
            .map_err(|e| {
                SftpError::ConnectionFailed(format!("Failed to request SFTP subsystem: {}", e))
            })?;

        let sftp = RusshSftpSession::new(channel.into_stream())
            .await
            .map_err(|e| {
                SftpError::ConnectionFailed(format!("Failed to initialize SFTP session: {}", e))
            })?;

        security_log::log_sftp_connect(&remote.host, remote.port, &remote.username);

        Ok(SftpSession::new(sftp, handle, remote.host.clone(), remote.port))
    }

    async fn authenticate(
        &self,
        handle: &mut client::Handle<ClientHandler>,
    ) -> Result<(), SftpError> {
        let remote = &self.remote;
        let method_name = "publickey";

        security_log::log_auth_attempt(&remote.host, remote.port, &remote.username, method_name);

        let auth_result = match handle
            .authenticate_publickey(remote.username.as_str(), self.credential.signer())
            .await
        {
            Ok(result) => result,
            Err(e) => {
                let reason = format!("Public key auth failed: {}", e);
                security_log::log_auth_failure(
                    &remote.host,
                    remote.port,
                    &remote.username,
                    method_name,
                    &reason,
                );
                return Err(SftpError::ConnectionFailed(reason));
            }
        };

        if !auth_result.success() {
            let reason = "Authentication rejected by server";
            security_log::log_auth_failure(
                &remote.host,
                remote.port,
                &remote.username,
                method_name,
                reason,
            );
            return Err(SftpError::ConnectionFailed(reason.to_string()));
        }

        security_log::log_auth_success(&remote.host, remote.port, &remote.username, method_name);
        Ok(())
    }
}

impl SessionFactory for SessionManager {
    type Session = SftpSession;

    async fn open_session(&self) -> Result<SftpSession, SftpError> {
        self.connect().await
    }
}
