pub mod paths;
pub mod settings;

pub use settings::{BridgeConfig, ListenConfig, RemoteConfig, SshDefaults, StreamConfig};
