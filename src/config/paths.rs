//! Cross-platform configuration path resolution
//!
//! - Linux/macOS: XDG_CONFIG_HOME/kubeplorer or ~/.config/kubeplorer
//! - Windows: %APPDATA%\kubeplorer\config

use std::path::PathBuf;

pub const CONFIG_DIR_ENV: &str = "KUBEPLORER_CONFIG_DIR";

/// Get the configuration directory path
///
/// Checks KUBEPLORER_CONFIG_DIR first.
pub fn config_dir() -> PathBuf {
    std::env::var(CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            #[cfg(windows)]
            {
                use directories::ProjectDirs;
                ProjectDirs::from("", "", "kubeplorer")
                    .map(|dirs| dirs.config_dir().to_path_buf())
                    .unwrap_or_else(|| PathBuf::from(".").join(".config").join("kubeplorer"))
            }
            #[cfg(not(windows))]
            {
                use directories::BaseDirs;
                std::env::var("XDG_CONFIG_HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| {
                        BaseDirs::new()
                            .map(|dirs| dirs.home_dir().join(".config"))
                            .unwrap_or_else(|| PathBuf::from(".").join(".config"))
                    })
                    .join("kubeplorer")
            }
        })
}

/// Get the root configuration file path
pub fn root_config_path() -> PathBuf {
    config_dir().join("config.yaml")
}
