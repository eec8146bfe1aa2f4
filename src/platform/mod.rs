// Tabshell platform abstraction
// Resolves the per-OS directories the shell persists into: settings and window
// placement live in the config dir, the bookmark database in the data dir, and
// finished downloads are looked up in the downloads dir.
//
// Uses `cfg(target_os)` for conditional compilation to select the correct
// platform-specific implementation at compile time.

use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// File name of the persisted window placement inside the config dir.
pub const WINDOW_STATE_FILE: &str = "window-state.json";

/// Returns the platform-specific configuration directory for Tabshell.
///
/// - **Linux**: `~/.config/tabshell` (or `$XDG_CONFIG_HOME/tabshell`)
/// - **macOS**: `~/Library/Application Support/Tabshell`
/// - **Windows**: `%APPDATA%/Tabshell`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_config_dir()
    }
}

/// Returns the platform-specific data directory for Tabshell.
///
/// - **Linux**: `~/.local/share/tabshell` (or `$XDG_DATA_HOME/tabshell`)
/// - **macOS**: `~/Library/Application Support/Tabshell`
/// - **Windows**: `%APPDATA%/Tabshell`
pub fn get_data_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_data_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_data_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_data_dir()
    }
}

/// Returns the user's downloads directory.
///
/// - **Linux**: `$XDG_DOWNLOAD_DIR` or `~/Downloads`
/// - **macOS**: `~/Downloads`
/// - **Windows**: `%USERPROFILE%/Downloads`
pub fn get_downloads_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_downloads_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_downloads_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_downloads_dir()
    }
}

/// Path of the window placement file.
pub fn window_state_path() -> PathBuf {
    get_config_dir().join(WINDOW_STATE_FILE)
}
