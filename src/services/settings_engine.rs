// Tabshell Settings Engine
// Loads and persists ShellSettings (discard timing, layout padding, search engine,
// window shaping, log filter) as pretty JSON under the platform config directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::ShellSettings;

pub const SETTINGS_FILE: &str = "settings.json";

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<ShellSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &ShellSettings;
    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &Path;
}

/// File-backed settings engine.
pub struct SettingsEngine {
    config_path: PathBuf,
    settings: ShellSettings,
}

impl SettingsEngine {
    /// Uses `path_override` when given, otherwise `<config dir>/settings.json`.
    pub fn new(path_override: Option<PathBuf>) -> Self {
        let config_path =
            path_override.unwrap_or_else(|| platform::get_config_dir().join(SETTINGS_FILE));
        Self {
            config_path,
            settings: ShellSettings::default(),
        }
    }

    /// Loads settings, falling back to defaults when the file is unreadable.
    pub fn load_or_default(&mut self) -> ShellSettings {
        match self.load() {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %self.config_path.display(), "Using default settings: {}", e);
                self.settings = ShellSettings::default();
                self.settings.clone()
            }
        }
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// Missing file yields defaults; a malformed file is a serialization error.
    fn load(&mut self) -> Result<ShellSettings, SettingsError> {
        if !self.config_path.exists() {
            self.settings = ShellSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;
        self.settings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;
        Ok(self.settings.clone())
    }

    fn save(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;
        fs::write(&self.config_path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))
    }

    fn get_settings(&self) -> &ShellSettings {
        &self.settings
    }

    /// Updates one value by dot path (e.g. `discard.idle_timeout_secs`,
    /// `layout.padding.top`) and saves.
    ///
    /// The whole tree is re-deserialized so a value of the wrong type is
    /// rejected with `InvalidValue` and leaves the settings untouched.
    fn set_value(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
        let Some((leaf, parents)) = parts.split_last() else {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        };

        let mut tree = serde_json::to_value(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        let mut node = &mut tree;
        for part in parents {
            node = node
                .get_mut(*part)
                .ok_or_else(|| SettingsError::InvalidKey(format!("Key '{}' not found", key)))?;
        }
        match node {
            Value::Object(map) if map.contains_key(*leaf) => {
                map.insert(leaf.to_string(), value);
            }
            _ => return Err(SettingsError::InvalidKey(format!("Key '{}' not found", key))),
        }

        self.settings = serde_json::from_value(tree).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;
        self.save()
    }

    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = ShellSettings::default();
        self.save()
    }

    fn get_config_path(&self) -> &Path {
        &self.config_path
    }
}
