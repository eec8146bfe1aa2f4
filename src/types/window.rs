use serde::{Deserialize, Serialize};

use super::geometry::Rect;

/// Identifier of one browser window (one window context).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u64);

/// Persisted window size, position and maximized flag.
///
/// `x`/`y` are `None` when the OS should choose the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowPlacement {
    pub width: i32,
    pub height: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    #[serde(default)]
    pub is_maximized: bool,
}

impl Default for WindowPlacement {
    fn default() -> Self {
        Self {
            width: 1440,
            height: 920,
            x: None,
            y: None,
            is_maximized: false,
        }
    }
}

/// A connected display and the part of it available to windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayInfo {
    pub work_area: Rect,
    #[serde(default)]
    pub is_primary: bool,
}

impl DisplayInfo {
    pub fn new(work_area: Rect, is_primary: bool) -> Self {
        Self {
            work_area,
            is_primary,
        }
    }
}

/// Whether a key event is a press or a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyEventKind {
    KeyDown,
    KeyUp,
}

/// A keyboard event as seen before it reaches page content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyInput {
    pub kind: KeyEventKind,
    /// Logical key, e.g. `"1"`.
    #[serde(default)]
    pub key: String,
    /// Physical key code, e.g. `"Digit1"`.
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub control: bool,
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub shift: bool,
}

/// Window outline to hand to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowShape {
    /// Plain rectangle (clear any custom shape).
    Full,
    /// One rectangle per pixel row.
    Rows(Vec<Rect>),
}

/// Maximized / always-on-top flags reported to the chrome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowStateReport {
    pub is_maximized: bool,
    pub is_always_on_top: bool,
}
