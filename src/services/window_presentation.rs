//! Window Presentation.
//!
//! Placement persistence and restore against the current displays, keyboard
//! size presets and the rounded window outline. All functions here are pure
//! except [`PlacementStore`], whose failures are logged and swallowed.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::types::errors::PlacementError;
use crate::types::geometry::{Rect, Size};
use crate::types::window::{DisplayInfo, KeyEventKind, KeyInput, WindowPlacement, WindowShape};

/// Side of the square that must stay on screen after a restore.
pub const MIN_VISIBLE: i32 = 120;

/// Keyboard size presets, selected with Alt+1 / Alt+2 / Alt+3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizePreset {
    Large,
    Medium,
    Small,
}

impl SizePreset {
    pub fn size(self) -> Size {
        match self {
            SizePreset::Large => Size::new(1100, 750),
            SizePreset::Medium => Size::new(950, 650),
            SizePreset::Small => Size::new(700, 450),
        }
    }

    fn from_digit(digit: &str) -> Option<Self> {
        match digit {
            "1" => Some(SizePreset::Large),
            "2" => Some(SizePreset::Medium),
            "3" => Some(SizePreset::Small),
            _ => None,
        }
    }
}

// === Placement persistence ===

/// Reads and writes the persisted window placement file.
#[derive(Debug, Clone)]
pub struct PlacementStore {
    path: PathBuf,
}

impl PlacementStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the placement. Missing or corrupt files yield the defaults;
    /// individual non-numeric fields fall back one by one.
    pub fn read(&self) -> WindowPlacement {
        let defaults = WindowPlacement::default();
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return defaults,
        };
        let parsed: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %self.path.display(), "Ignoring corrupt window state: {}", e);
                return defaults;
            }
        };

        let int = |key: &str| parsed.get(key).and_then(Value::as_f64).map(|v| v.round() as i32);
        WindowPlacement {
            width: int("width").unwrap_or(defaults.width),
            height: int("height").unwrap_or(defaults.height),
            x: int("x"),
            y: int("y"),
            is_maximized: parsed
                .get("isMaximized")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }

    pub fn write(&self, placement: &WindowPlacement) -> Result<(), PlacementError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(placement)?;
        fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "Window state written");
        Ok(())
    }

    /// Like [`write`](Self::write), logging instead of returning failures.
    pub fn persist(&self, placement: &WindowPlacement) {
        if let Err(e) = self.write(placement) {
            warn!(path = %self.path.display(), "{}", e);
        }
    }
}

// === Placement restore ===

fn primary_work_area(displays: &[DisplayInfo]) -> Option<Rect> {
    displays
        .iter()
        .find(|d| d.is_primary)
        .or_else(|| displays.first())
        .map(|d| d.work_area)
}

fn best_display(rect: &Rect, displays: &[DisplayInfo]) -> Option<(Rect, i64)> {
    let mut best: Option<(Rect, i64)> = None;
    for display in displays {
        let overlap = rect.intersection_area(&display.work_area);
        if overlap > best.map_or(0, |(_, b)| b) {
            best = Some((display.work_area, overlap));
        }
    }
    best
}

/// Fits a persisted placement onto the current displays.
///
/// Size is clamped to `[min, primary work area]`. The position is dropped
/// (OS placement) when it is missing or no display shows at least a
/// [`MIN_VISIBLE`]² area of the window; otherwise it is clamped so that square
/// stays on the best-overlapping display. `is_maximized` is always kept.
pub fn normalize_placement(
    state: &WindowPlacement,
    displays: &[DisplayInfo],
    min: Size,
) -> WindowPlacement {
    let primary = primary_work_area(displays);
    let width = primary
        .map_or(state.width, |wa| state.width.min(wa.width))
        .max(min.width);
    let height = primary
        .map_or(state.height, |wa| state.height.min(wa.height))
        .max(min.height);

    let os_placed = WindowPlacement {
        width,
        height,
        x: None,
        y: None,
        is_maximized: state.is_maximized,
    };

    let (Some(x), Some(y)) = (state.x, state.y) else {
        return os_placed;
    };
    let target = Rect::new(x, y, width, height);
    let Some((wa, overlap)) = best_display(&target, displays) else {
        return os_placed;
    };
    if overlap < i64::from(MIN_VISIBLE) * i64::from(MIN_VISIBLE) {
        return os_placed;
    }

    let clamped_x = x.max(wa.x - width + MIN_VISIBLE).min(wa.right() - MIN_VISIBLE);
    let clamped_y = y.max(wa.y - height + MIN_VISIBLE).min(wa.bottom() - MIN_VISIBLE);
    WindowPlacement {
        x: Some(clamped_x),
        y: Some(clamped_y),
        ..os_placed
    }
}

// === Size presets ===

/// Alt+digit (no other modifiers, key down) selects a preset. The physical
/// `DigitN` code wins over the logical key.
pub fn preset_from_input(input: &KeyInput) -> Option<SizePreset> {
    if input.kind != KeyEventKind::KeyDown
        || !input.alt
        || input.control
        || input.meta
        || input.shift
    {
        return None;
    }
    let digit = input.code.strip_prefix("Digit").unwrap_or(&input.key);
    SizePreset::from_digit(digit)
}

/// New window bounds for `preset` on the display matching `bounds`, keeping
/// the top-left corner where it fits.
pub fn apply_size_preset(
    bounds: Rect,
    preset: SizePreset,
    displays: &[DisplayInfo],
    min: Size,
) -> Rect {
    let work_area = best_display(&bounds, displays)
        .map(|(wa, _)| wa)
        .or_else(|| primary_work_area(displays));
    let size = preset.size();
    let Some(wa) = work_area else {
        return Rect::new(
            bounds.x,
            bounds.y,
            size.width.max(min.width),
            size.height.max(min.height),
        );
    };

    let width = size.width.max(min.width).min(wa.width);
    let height = size.height.max(min.height).min(wa.height);
    let x = bounds.x.max(wa.x).min(wa.right() - width);
    let y = bounds.y.max(wa.y).min(wa.bottom() - height);
    Rect::new(x, y, width, height)
}

// === Window shape ===

/// One rectangle per pixel row, inset along a quarter circle of `radius`
/// at the four corners.
pub fn rounded_window_shape(width: i32, height: i32, radius: i32) -> Vec<Rect> {
    let r = radius.min(width.min(height) / 2).max(0);
    if r == 0 {
        return vec![Rect::new(0, 0, width, height)];
    }

    let inset_for = |dy: i32| -> i32 {
        let (r, dy) = (f64::from(r), f64::from(dy));
        (r - (r * r - dy * dy).max(0.0).sqrt()).ceil() as i32
    };

    (0..height)
        .filter_map(|y| {
            let inset = if y < r {
                inset_for(r - y - 1)
            } else if y >= height - r {
                inset_for(y - (height - r))
            } else {
                0
            };
            let row_width = width - inset * 2;
            (row_width > 0).then(|| Rect::new(inset, y, row_width, 1))
        })
        .collect()
}

/// Shape to apply to a window, or `None` when nothing should be set.
///
/// Platforms without custom shaping (and macOS, which rounds natively) get
/// `None`; maximized or fullscreen windows get the plain rectangle.
pub fn window_shape(
    size: Size,
    radius: i32,
    maximized_or_fullscreen: bool,
    supports_shape: bool,
) -> Option<WindowShape> {
    if !supports_shape || cfg!(target_os = "macos") {
        return None;
    }
    if maximized_or_fullscreen {
        return Some(WindowShape::Full);
    }
    if size.width < 2 || size.height < 2 {
        return None;
    }
    Some(WindowShape::Rows(rounded_window_shape(
        size.width,
        size.height,
        radius,
    )))
}
