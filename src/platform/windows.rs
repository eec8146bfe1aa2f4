// Tabshell platform paths for Windows
// Config:    %APPDATA%/Tabshell
// Data:      %APPDATA%/Tabshell
// Downloads: %USERPROFILE%/Downloads

use std::env;
use std::path::PathBuf;

fn appdata_dir() -> PathBuf {
    let appdata =
        env::var("APPDATA").unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Roaming"));
    PathBuf::from(appdata)
}

/// `%APPDATA%/Tabshell`
pub fn get_config_dir() -> PathBuf {
    appdata_dir().join("Tabshell")
}

/// `%APPDATA%/Tabshell`
pub fn get_data_dir() -> PathBuf {
    appdata_dir().join("Tabshell")
}

pub fn get_downloads_dir() -> PathBuf {
    let profile =
        env::var("USERPROFILE").unwrap_or_else(|_| String::from("C:\\Users\\Default"));
    PathBuf::from(profile).join("Downloads")
}
