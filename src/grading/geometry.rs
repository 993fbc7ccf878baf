//! Overlay geometry — maps model bounding boxes onto the rendered image.
//!
//! The model reports boxes on a fixed 0-1000 scale relative to image
//! content. Dividing by 10 yields percentages of the rendered box, so
//! the mapping is independent of actual pixel dimensions. It assumes
//! the displayed element preserves the image's aspect ratio.

use serde::Serialize;

use super::types::BoundingBox;

/// Percentage-based rectangle for absolute positioning over the
/// displayed image (0-100 scale on every field).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlayRect {
    pub top: f64,
    pub left: f64,
    pub height: f64,
    pub width: f64,
}

impl BoundingBox {
    /// Convert to percentage geometry for overlay rendering.
    pub fn to_overlay(self) -> OverlayRect {
        OverlayRect {
            top: self.ymin as f64 / 10.0,
            left: self.xmin as f64 / 10.0,
            height: (self.ymax - self.ymin) as f64 / 10.0,
            width: (self.xmax - self.xmin) as f64 / 10.0,
        }
    }
}
