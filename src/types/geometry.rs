use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in logical window units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// The zero-area rectangle used to hide a surface without destroying it.
    pub const ZERO: Rect = Rect {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when the rectangle covers no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Area shared with `other`, zero when they do not overlap.
    pub fn intersection_area(&self, other: &Rect) -> i64 {
        let x_overlap = (self.right().min(other.right()) - self.x.max(other.x)).max(0) as i64;
        let y_overlap = (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0) as i64;
        x_overlap * y_overlap
    }
}

/// Width and height of a window's content box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Space reserved around the content area for the chrome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insets {
    pub top: i32,
    pub left: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Default for Insets {
    fn default() -> Self {
        Self {
            top: 60,
            left: 64,
            right: 8,
            bottom: 8,
        }
    }
}
