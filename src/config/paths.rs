use directories::ProjectDirs;
use std::path::PathBuf;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SFTP_BRIDGE_CONFIG";

/// Environment variable enabling file logging into the given directory.
pub const LOG_DIR_ENV: &str = "SFTP_BRIDGE_LOG_DIR";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("org", "kde", "sftp-bridge")
        .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
}

/// Get the path to the config file, honoring `$SFTP_BRIDGE_CONFIG`
pub fn config_file() -> Option<PathBuf> {
    if let Some(path) = non_empty_env(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the path to the user's SSH known_hosts file
pub fn ssh_known_hosts_file() -> Option<PathBuf> {
    ssh_dir().map(|dir| dir.join("known_hosts"))
}

/// Expand tilde in path (e.g., ~/.ssh/id_rsa -> /home/user/.ssh/id_rsa)
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Get the user's home directory
fn dirs_home() -> Option<PathBuf> {
    // Try directories crate first, fall back to HOME env var
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .or_else(|| std::env::var("HOME").ok().map(PathBuf::from))
}

/// Get the default SSH directory
pub fn ssh_dir() -> Option<PathBuf> {
    dirs_home().map(|home| home.join(".ssh"))
}

/// Get the log directory, if file logging was requested.
///
/// A long-running service logs to the console by default; a directory is
/// only used when `$SFTP_BRIDGE_LOG_DIR` names one.
pub fn log_dir() -> Option<PathBuf> {
    non_empty_env(LOG_DIR_ENV).map(PathBuf::from)
}

/// Ensure the log directory exists with proper permissions
pub fn ensure_log_dir() -> std::io::Result<Option<PathBuf>> {
    let Some(dir) = log_dir() else {
        return Ok(None);
    };

    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))?;
        }
    }

    Ok(Some(dir))
}

fn non_empty_env(name: &str) -> Option<String> {
    let raw = std::env::var(name).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
