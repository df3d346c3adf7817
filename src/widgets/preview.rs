//! Thumbnail preview shown above the slider while scrubbing.
//!
//! Positioning uses three zones over the scrub fraction:
//! - `[0, 0.03)`: pinned to the left margin
//! - `[0.03, 0.93]`: linear across the width left between the margins
//! - `(0.93, 1]`: pinned to the right margin
//!
//! The linear zone reaches both pinned offsets exactly at its edges, so the
//! mapping is continuous and monotonic.

use crate::engine::FrameSize;
use image::{Rgba, RgbaImage};

/// Start of the linear zone
pub const LINEAR_ZONE_START: f32 = 0.03;
/// End of the linear zone
pub const LINEAR_ZONE_END: f32 = 0.93;

/// Shown when a frame could not be produced
pub const PLACEHOLDER_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Horizontal geometry of the preview inside the player view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreviewGeometry {
    pub view_width: f32,
    pub preview_width: f32,
    pub left_margin: f32,
    pub right_margin: f32,
}

impl PreviewGeometry {
    /// Left edge of the preview for scrub fraction `progress`.
    pub fn offset_x(&self, progress: f32) -> f32 {
        let restricted = self.view_width - (self.left_margin + self.right_margin) - self.preview_width;
        if progress < LINEAR_ZONE_START {
            self.left_margin
        } else if progress <= LINEAR_ZONE_END {
            let t = (progress - LINEAR_ZONE_START) / (LINEAR_ZONE_END - LINEAR_ZONE_START);
            (self.left_margin + restricted * t).max(self.left_margin)
        } else {
            self.view_width - (self.preview_width + self.right_margin)
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PreviewImage {
    Frame(RgbaImage),
    Placeholder(Rgba<u8>),
}

/// What the preview overlay currently shows.
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewState {
    pub visible: bool,
    pub offset_x: f32,
    pub time_label: String,
    pub size: FrameSize,
    pub image: Option<PreviewImage>,
}

impl PreviewState {
    pub fn new(size: FrameSize) -> Self {
        Self {
            visible: false,
            offset_x: 0.0,
            time_label: String::new(),
            size,
            image: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> PreviewGeometry {
        PreviewGeometry {
            view_width: 640.0,
            preview_width: 160.0,
            left_margin: 8.0,
            right_margin: 8.0,
        }
    }

    #[test]
    fn test_pinned_zones() {
        let g = geometry();
        assert_eq!(g.offset_x(0.0), 8.0);
        assert_eq!(g.offset_x(0.02), 8.0);
        assert_eq!(g.offset_x(0.95), 472.0);
        assert_eq!(g.offset_x(1.0), 472.0);
    }

    #[test]
    fn test_zone_edges_agree() {
        let g = geometry();
        assert!((g.offset_x(LINEAR_ZONE_START) - 8.0).abs() < 1e-3);
        assert!((g.offset_x(LINEAR_ZONE_END) - 472.0).abs() < 1e-3);
    }

    #[test]
    fn test_monotonic_and_inside_view() {
        let g = geometry();
        let mut last = f32::MIN;
        for i in 0..=1000 {
            let x = g.offset_x(i as f32 / 1000.0);
            assert!(x + 1e-3 >= last, "offset went backwards at {}", i);
            assert!(x >= g.left_margin);
            assert!(x + g.preview_width <= g.view_width - g.right_margin + 1e-3);
            last = x;
        }
    }
}
