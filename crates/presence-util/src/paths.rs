//! Default paths for presenced components
//!
//! Paths are user-writable by default:
//! - Socket: `$XDG_RUNTIME_DIR/presenced/presenced.sock` or `/tmp/presenced-$USER/presenced.sock`
//! - Config: `$XDG_CONFIG_HOME/presenced/config.toml` or `~/.config/presenced/config.toml`
//! - Data: `$XDG_DATA_HOME/presenced` or `~/.local/share/presenced`
//! - Logs: `$XDG_STATE_HOME/presenced` or `~/.local/state/presenced`

use std::path::PathBuf;

/// Environment variable for overriding the socket path
pub const PRESENCE_SOCKET_ENV: &str = "PRESENCE_SOCKET";

/// Environment variable for overriding the data directory
pub const PRESENCE_DATA_DIR_ENV: &str = "PRESENCE_DATA_DIR";

const SOCKET_FILENAME: &str = "presenced.sock";
const CONFIG_FILENAME: &str = "config.toml";
const APP_DIR: &str = "presenced";

/// Get the default socket path, honouring `$PRESENCE_SOCKET`.
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(PRESENCE_SOCKET_ENV) {
        return PathBuf::from(path);
    }

    socket_path_without_env()
}

/// Socket path derived from the XDG runtime dir only.
pub fn socket_path_without_env() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

/// Get the default configuration file path.
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Get the default data directory, honouring `$PRESENCE_DATA_DIR`.
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(PRESENCE_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Data directory derived from the XDG data home only.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Get the default log directory.
pub fn default_log_dir() -> PathBuf {
    if let Ok(state_home) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(state_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("state")
            .join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_path_contains_app_dir() {
        let path = socket_path_without_env();
        assert!(path.to_string_lossy().contains("presenced"));
        assert!(path.to_string_lossy().ends_with(".sock"));
    }

    #[test]
    fn config_path_is_toml() {
        let path = default_config_path();
        assert!(path.to_string_lossy().contains("presenced"));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("toml"));
    }

    #[test]
    fn data_and_log_dirs_contain_app_dir() {
        assert!(data_dir_without_env().to_string_lossy().contains("presenced"));
        assert!(default_log_dir().to_string_lossy().contains("presenced"));
    }
}
