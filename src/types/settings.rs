use serde::{Deserialize, Serialize};

use super::geometry::Insets;

/// Top-level shell settings container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShellSettings {
    #[serde(default)]
    pub discard: DiscardSettings,
    #[serde(default)]
    pub layout: LayoutSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub window: WindowSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Background-tab discard timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscardSettings {
    pub idle_timeout_secs: u64,
    pub media_recheck_secs: u64,
}

impl Default for DiscardSettings {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 900,
            media_recheck_secs: 30,
        }
    }
}

/// Chrome padding around the content area.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutSettings {
    pub padding: Insets,
}

/// Search engine used for non-URL input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Origin of the search engine; queries go to `<base_url>/search?q=`.
    pub base_url: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.google.com".to_string(),
        }
    }
}

/// Window presentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSettings {
    pub corner_radius: i32,
    pub surface_corner_radius: i32,
    pub min_width: i32,
    pub min_height: i32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            corner_radius: 2,
            surface_corner_radius: 8,
            min_width: 320,
            min_height: 240,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "tabshell=info".to_string(),
        }
    }
}
