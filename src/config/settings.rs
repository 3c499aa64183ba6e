use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::validation;

/// Bridge settings, read from config.toml with every field defaulted
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct BridgeConfig {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub ssh: SshDefaults,
    #[serde(default)]
    pub stream: StreamConfig,
}

impl BridgeConfig {
    /// Load from the config file (if any), apply `$PORT` and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match super::paths::config_file() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_port_override(std::env::var("PORT").ok().as_deref())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without applying overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Replace the listen port with the value of `$PORT`, when set and non-empty.
    pub fn apply_port_override(&mut self, port: Option<&str>) -> Result<(), ConfigError> {
        match port {
            Some(raw) if !raw.trim().is_empty() => {
                self.listen.port = validation::validate_port(raw)
                    .map_err(|e| ConfigError::Invalid(format!("PORT {}", e.message)))?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |e: validation::ValidationError| ConfigError::Invalid(e.to_string());

        validation::validate_bind_address(self.listen.address).map_err(invalid)?;
        if self.listen.port == 0 {
            return Err(ConfigError::Invalid("listen.port: must not be 0".to_string()));
        }

        validation::validate_hostname(&self.remote.host).map_err(invalid)?;
        if self.remote.port == 0 {
            return Err(ConfigError::Invalid("remote.port: must not be 0".to_string()));
        }
        validation::validate_username(&self.remote.username).map_err(invalid)?;
        validation::validate_remote_root(&self.remote.root).map_err(invalid)?;

        if self.ssh.connection_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "ssh.connection_timeout_secs: must be greater than 0".to_string(),
            ));
        }

        if self.stream.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "stream.chunk_size: must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen.address, self.listen.port)
    }

    /// Private key path with `~` expanded
    pub fn key_path(&self) -> PathBuf {
        super::paths::expand_tilde(&self.remote.key_path)
    }
}

fn default_listen_address() -> IpAddr {
    // docker0 bridge; close enough to localhost for the container in front
    IpAddr::V4(Ipv4Addr::new(172, 17, 0, 1))
}

fn default_listen_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ListenConfig {
    #[serde(default = "default_listen_address")]
    pub address: IpAddr,
    #[serde(default = "default_listen_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: default_listen_address(),
            port: default_listen_port(),
        }
    }
}

fn default_remote_host() -> String {
    "depot.kde.org".to_string()
}

fn default_remote_port() -> u16 {
    22
}

fn default_remote_username() -> String {
    "ftpneon".to_string()
}

fn default_remote_root() -> String {
    "/home/ftpubuntu".to_string()
}

fn default_key_path() -> String {
    "~/.ssh/id_rsa".to_string()
}

/// Where and as whom the bridge connects
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RemoteConfig {
    #[serde(default = "default_remote_host")]
    pub host: String,
    #[serde(default = "default_remote_port")]
    pub port: u16,
    #[serde(default = "default_remote_username")]
    pub username: String,
    /// Every request path is resolved below this directory
    #[serde(default = "default_remote_root")]
    pub root: String,
    #[serde(default = "default_key_path")]
    pub key_path: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: default_remote_host(),
            port: default_remote_port(),
            username: default_remote_username(),
            root: default_remote_root(),
            key_path: default_key_path(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_keepalive() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SshDefaults {
    #[serde(default = "default_timeout")]
    pub connection_timeout_secs: u64,
    #[serde(default = "default_keepalive")]
    pub keepalive_interval_secs: u64,
    /// Reject host keys that are missing from known_hosts
    #[serde(default)]
    pub strict_host_key_checking: bool,
}

impl SshDefaults {
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }
}

impl Default for SshDefaults {
    fn default() -> Self {
        Self {
            connection_timeout_secs: 30,
            keepalive_interval_secs: 60,
            strict_host_key_checking: false,
        }
    }
}

fn default_chunk_size() -> usize {
    32 * 1024
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StreamConfig {
    /// Upper bound for a single remote read
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_the_deployed_bridge() {
        let config = BridgeConfig::default();
        assert_eq!(config.listen_addr().to_string(), "172.17.0.1:8080");
        assert_eq!(config.remote.host, "depot.kde.org");
        assert_eq!(config.remote.port, 22);
        assert_eq!(config.remote.username, "ftpneon");
        assert_eq!(config.remote.root, "/home/ftpubuntu");
        assert!(config.key_path().ends_with(".ssh/id_rsa"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [remote]
            root = "/srv/files"

            [stream]
            chunk_size = 4096
            "#,
        )
        .expect("parse");

        assert_eq!(config.remote.root, "/srv/files");
        assert_eq!(config.remote.host, "depot.kde.org");
        assert_eq!(config.stream.chunk_size, 4096);
        assert_eq!(config.listen, ListenConfig::default());
    }

    #[test]
    fn load_from_reads_file() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[listen]\naddress = \"127.0.0.1\"\nport = 9000\n")
            .expect("write config");

        let config = BridgeConfig::load_from(&path).expect("load");
        assert_eq!(config.listen_addr().to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn load_from_missing_file_fails() {
        let dir = tempdir().expect("temp dir");
        let err = BridgeConfig::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[listen\nport = ").expect("write config");

        let err = BridgeConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn port_override_replaces_listen_port() {
        let mut config = BridgeConfig::default();
        config.apply_port_override(Some("9999")).expect("override");
        assert_eq!(config.listen.port, 9999);

        config.apply_port_override(Some("")).expect("empty is ignored");
        config.apply_port_override(None).expect("unset is ignored");
        assert_eq!(config.listen.port, 9999);
    }

    #[test]
    fn port_override_rejects_garbage() {
        let mut config = BridgeConfig::default();
        let err = config.apply_port_override(Some("http")).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn public_bind_address_is_refused() {
        let mut config = BridgeConfig::default();
        config.listen.address = "0.0.0.0".parse().unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("listen.address"));
    }

    #[test]
    fn relative_root_is_refused() {
        let mut config = BridgeConfig::default();
        config.remote.root = "home/ftpubuntu".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_chunk_size_is_refused() {
        let mut config = BridgeConfig::default();
        config.stream.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_connection_timeout_is_refused() {
        let mut config = BridgeConfig::default();
        config.ssh.connection_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ssh.connection_timeout_secs"));
    }
}
