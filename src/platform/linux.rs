// Tabshell platform paths for Linux
// Config:    ~/.config/tabshell
// Data:      ~/.local/share/tabshell
// Downloads: $XDG_DOWNLOAD_DIR or ~/Downloads

use std::env;
use std::path::PathBuf;

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// Returns the configuration directory for Tabshell on Linux.
/// Uses `$XDG_CONFIG_HOME/tabshell` if set, otherwise `~/.config/tabshell`.
pub fn get_config_dir() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("tabshell")
    } else {
        home_dir().join(".config").join("tabshell")
    }
}

/// Returns the data directory for Tabshell on Linux.
/// Uses `$XDG_DATA_HOME/tabshell` if set, otherwise `~/.local/share/tabshell`.
pub fn get_data_dir() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg).join("tabshell")
    } else {
        home_dir().join(".local").join("share").join("tabshell")
    }
}

pub fn get_downloads_dir() -> PathBuf {
    match env::var("XDG_DOWNLOAD_DIR") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => home_dir().join("Downloads"),
    }
}
