//! Layout Engine.
//!
//! Computes the content rectangle for the active surface and is the single
//! writer of surface visibility: the active tab gets the content bounds,
//! every other surface (and all of them while the web layer is hidden) gets a
//! zero rectangle.

use serde::{Deserialize, Serialize};

use crate::engine::{SurfaceFactory, WebSurface};
use crate::managers::surface_registry::SurfaceRegistry;
use crate::types::geometry::{Insets, Rect, Size};

pub const MIN_CONTENT_WIDTH: i32 = 320;
pub const MIN_CONTENT_HEIGHT: i32 = 200;

/// Bounds reported by the chrome; missing fields fall back to the padding
/// origin and the minimum size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundsRequest {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// Window content box inset by `padding`, floored at the minimum size.
pub fn compute_bounds(size: Size, padding: &Insets) -> Rect {
    Rect {
        x: padding.left,
        y: padding.top,
        width: (size.width - padding.left - padding.right).max(MIN_CONTENT_WIDTH),
        height: (size.height - padding.top - padding.bottom).max(MIN_CONTENT_HEIGHT),
    }
}

#[derive(Debug, Clone)]
pub struct LayoutEngine {
    padding: Insets,
    window_size: Size,
    last_bounds: Option<Rect>,
    hidden: bool,
}

impl LayoutEngine {
    pub fn new(padding: Insets, window_size: Size) -> Self {
        Self {
            padding,
            window_size,
            last_bounds: None,
            hidden: false,
        }
    }

    /// Records explicit bounds from the chrome. Returns `false` when they
    /// equal the last explicit bounds, in which case nothing needs reapplying.
    pub fn set_explicit_bounds(&mut self, request: BoundsRequest) -> bool {
        let round = |v: Option<f64>, default: i32| v.map(|v| v.round() as i32).unwrap_or(default);
        let bounds = Rect {
            x: round(request.x, self.padding.left),
            y: round(request.y, self.padding.top),
            width: round(request.width, MIN_CONTENT_WIDTH).max(MIN_CONTENT_WIDTH),
            height: round(request.height, MIN_CONTENT_HEIGHT).max(MIN_CONTENT_HEIGHT),
        };
        if self.last_bounds == Some(bounds) {
            return false;
        }
        self.last_bounds = Some(bounds);
        true
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_window_size(&mut self, size: Size) {
        self.window_size = size;
    }

    pub fn window_size(&self) -> Size {
        self.window_size
    }

    /// Explicit bounds when the chrome reported any, otherwise the computed default.
    pub fn current_bounds(&self) -> Rect {
        self.last_bounds
            .unwrap_or_else(|| compute_bounds(self.window_size, &self.padding))
    }

    /// Pushes bounds to every registered surface.
    pub fn apply<F: SurfaceFactory>(&self, registry: &mut SurfaceRegistry<F>, active: Option<&str>) {
        let bounds = self.current_bounds();
        for entry in registry.entries_mut() {
            let visible = !self.hidden && active == Some(entry.tab_id.as_str());
            entry
                .surface
                .set_bounds(if visible { bounds } else { Rect::ZERO });
        }
    }
}
