//! Integration tests for startup: configuration and credential loading

mod common;

use std::net::{IpAddr, Ipv4Addr};

use common::{FakeFactory, FakeRemote, TestEnvironment};
use sftp_bridge::bridge::{Bridge, Resolution};
use sftp_bridge::config::BridgeConfig;
use sftp_bridge::error::{ConfigError, SshError};
use sftp_bridge::ssh::auth::load_credential;

#[test]
fn test_config_file_drives_bridge() {
    let env = TestEnvironment::new();
    let path = env.write(
        "config.toml",
        r#"
[listen]
address = "127.0.0.1"
port = 9000

[remote]
host = "files.example.org"
username = "mirror"
root = "/srv/mirror/"

[stream]
chunk_size = 4096
"#,
    );

    let config = BridgeConfig::load_from(&path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.listen.address, IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert_eq!(config.listen_addr().port(), 9000);
    assert_eq!(config.remote.port, 22);

    let bridge = Bridge::from_config(&config, FakeFactory::new(FakeRemote::new()));
    match bridge.resolver().resolve("/pool/a.deb") {
        Resolution::Allowed(path) => assert_eq!(path.as_str(), "/srv/mirror/pool/a.deb"),
        Resolution::Denied(reason) => panic!("denied: {reason}"),
    }
}

#[test]
fn test_invalid_config_is_rejected() {
    let env = TestEnvironment::new();
    let path = env.write("config.toml", "[listen]\naddress = \"0.0.0.0\"\n");

    let config = BridgeConfig::load_from(&path).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_missing_key_is_fatal() {
    let env = TestEnvironment::new();
    let missing = env.config_dir.path().join("id_rsa");

    assert!(matches!(
        load_credential(&missing, None),
        Err(SshError::KeyFile(_))
    ));
}

#[test]
fn test_public_key_is_not_a_credential() {
    let env = TestEnvironment::new();
    let path = env.write(
        "id_ed25519.pub",
        "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOMqqnkVzrm0SdG6UOoqKLsabgH5C9okWi0dh2l9GKJl user@host\n",
    );

    match load_credential(&path, None) {
        Err(SshError::KeyFile(message)) => assert!(message.contains("PUBLIC key")),
        other => panic!("unexpected result: {other:?}"),
    }
}
