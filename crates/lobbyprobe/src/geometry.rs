//! Pixel geometry shared by the locator, the mapper and the protocols.
//!
//! Boxes produced from screenshots are in device pixels. Points handed to
//! the browser are in CSS viewport pixels; see [`crate::coords`].

use serde::{Deserialize, Serialize};

/// Axis-aligned box in device pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelBox {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width
    pub width: i32,
    /// Height
    pub height: i32,
}

impl PixelBox {
    /// Create a new box
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (exclusive)
    #[must_use]
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Bottom edge (exclusive)
    #[must_use]
    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Center point, rounded toward the top-left
    #[must_use]
    pub const fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Whether the box has no area
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Check if a point is inside this box
    #[must_use]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Whether the box lies fully inside a `width` x `height` image
    #[must_use]
    pub const fn within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.right() <= width as i32
            && self.bottom() <= height as i32
    }

    /// Same box moved vertically by `dy`
    #[must_use]
    pub const fn shifted_down(&self, dy: i32) -> Self {
        Self::new(self.x, self.y + dy, self.width, self.height)
    }

    /// Intersect with the bounds of a `width` x `height` image.
    ///
    /// Returns `None` when nothing of the box survives.
    #[must_use]
    pub fn clip_to(&self, width: u32, height: u32) -> Option<Self> {
        let left = self.x.max(0);
        let top = self.y.max(0);
        let right = self.right().min(width as i32);
        let bottom = self.bottom().min(height as i32);
        let clipped = Self::new(left, top, right - left, bottom - top);
        (!clipped.is_empty()).then_some(clipped)
    }
}

/// Point in CSS viewport pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewportPoint {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
}

impl ViewportPoint {
    /// Create a new point
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Point moved by an offset
    #[must_use]
    pub const fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

// =============================================================================
// SEARCH REGIONS
// =============================================================================

/// Region to the right of a field label where its current value renders.
///
/// Clamped to the image so that the region is at least 40x30 where the
/// image allows it.
#[must_use]
pub fn value_region_right_of(label: &PixelBox, image_width: u32, image_height: u32) -> PixelBox {
    const GAP: i32 = 12;
    const WIDTH: i32 = 620;
    const HEIGHT: i32 = 72;
    const DY: i32 = 2;

    let w = image_width as i32;
    let h = image_height as i32;
    let rx = (label.right() + GAP).max(0).min(w - 1);
    let ry = (label.y - 10 + DY).max(0);
    let rw = WIDTH.min((w - rx).max(40));
    let rh = HEIGHT.min((h - ry).max(30));
    PixelBox::new(rx, ry, rw, rh)
}

/// Padding around an anchor box where open dropdown options render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropdownPadding {
    /// Pixels left of the anchor
    pub left: i32,
    /// Pixels right of the anchor
    pub right: i32,
    /// Gap between the anchor bottom and the region top
    pub gap: i32,
    /// Region height below the gap
    pub below: i32,
}

impl Default for DropdownPadding {
    fn default() -> Self {
        Self {
            left: 220,
            right: 320,
            gap: 6,
            below: 560,
        }
    }
}

/// Region below an anchor (current value or label) where options render
#[must_use]
pub fn dropdown_region_below(
    anchor: &PixelBox,
    padding: DropdownPadding,
    image_width: u32,
    image_height: u32,
) -> PixelBox {
    let w = image_width as i32;
    let h = image_height as i32;
    let rx = (anchor.x - padding.left).max(0);
    let ry = (anchor.bottom() + padding.gap).max(0);
    let rw = (anchor.width + padding.left + padding.right).min(w - rx);
    let rh = padding.below.min(h - ry);
    PixelBox::new(rx, ry, rw, rh)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod pixel_box_tests {
        use super::*;

        #[test]
        fn test_center_and_edges() {
            let b = PixelBox::new(10, 20, 30, 41);
            assert_eq!(b.center(), (25, 40));
            assert_eq!(b.right(), 40);
            assert_eq!(b.bottom(), 61);
        }

        #[test]
        fn test_contains_is_half_open() {
            let b = PixelBox::new(0, 0, 10, 10);
            assert!(b.contains(0, 0));
            assert!(b.contains(9, 9));
            assert!(!b.contains(10, 5));
        }

        #[test]
        fn test_clip_inside_is_identity() {
            let b = PixelBox::new(5, 5, 10, 10);
            assert_eq!(b.clip_to(100, 100), Some(b));
        }

        #[test]
        fn test_clip_partial() {
            let b = PixelBox::new(-5, 90, 20, 20);
            assert_eq!(b.clip_to(100, 100), Some(PixelBox::new(0, 90, 15, 10)));
        }

        #[test]
        fn test_clip_outside_is_none() {
            assert_eq!(PixelBox::new(200, 0, 10, 10).clip_to(100, 100), None);
            assert_eq!(PixelBox::new(0, 0, 0, 10).clip_to(100, 100), None);
        }

        #[test]
        fn test_within() {
            assert!(PixelBox::new(0, 0, 100, 100).within(100, 100));
            assert!(!PixelBox::new(1, 0, 100, 100).within(100, 100));
        }
    }

    mod region_tests {
        use super::*;

        #[test]
        fn test_value_region_right_of_label() {
            let label = PixelBox::new(100, 200, 80, 20);
            let roi = value_region_right_of(&label, 1600, 1000);
            assert_eq!(roi, PixelBox::new(192, 192, 620, 72));
        }

        #[test]
        fn test_value_region_clamps_at_right_edge() {
            let label = PixelBox::new(1500, 5, 90, 20);
            let roi = value_region_right_of(&label, 1600, 1000);
            assert_eq!(roi.x, 1599);
            assert_eq!(roi.y, 0);
            assert_eq!(roi.width, 40);
        }

        #[test]
        fn test_dropdown_region_below_anchor() {
            let anchor = PixelBox::new(400, 100, 60, 20);
            let roi = dropdown_region_below(&anchor, DropdownPadding::default(), 1600, 1000);
            assert_eq!(roi, PixelBox::new(180, 126, 600, 560));
        }

        #[test]
        fn test_dropdown_region_clamped_to_image() {
            let anchor = PixelBox::new(100, 700, 60, 20);
            let roi = dropdown_region_below(&anchor, DropdownPadding::default(), 1600, 1000);
            assert_eq!(roi.x, 0);
            assert_eq!(roi.y, 726);
            assert_eq!(roi.bottom(), 1000);
        }
    }
}
