//! Screen-space rectangle and edge-offset value types.
//!
//! `Rect` mirrors the Win32 RECT layout (left/top/right/bottom, exclusive far
//! edges) but stays independent of the `windows` crate so the tracker, state
//! machine, and scheduler can be exercised without OS types. `EdgeOffsets`
//! carries the per-session pixel adjustments applied to the overlay window so
//! its bounding box is deliberately not pixel-identical to the target's.

/// Axis-aligned rectangle in screen coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// A rectangle with no area, as returned when no target is active.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Shift every edge by its configured offset. Left/top move the origin,
    /// right/bottom move the far edges; the size follows from the shifted
    /// edges.
    pub fn offset_by(&self, offsets: EdgeOffsets) -> Rect {
        Rect {
            left: self.left + offsets.left,
            top: self.top + offsets.top,
            right: self.right + offsets.right,
            bottom: self.bottom + offsets.bottom,
        }
    }
}

/// Signed per-edge pixel adjustments, generated once per session.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EdgeOffsets {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_shift_origin_and_far_edges() {
        let rect = Rect::new(100, 100, 400, 300);
        let offsets = EdgeOffsets {
            left: 5,
            top: -3,
            right: 10,
            bottom: 0,
        };
        let out = rect.offset_by(offsets);
        assert_eq!(out.left, 105);
        assert_eq!(out.top, 97);
        assert_eq!(out.right, 410);
        assert_eq!(out.bottom, 300);
        assert_eq!(out.width(), 305);
        assert_eq!(out.height(), 203);
    }

    #[test]
    fn zero_offsets_are_identity() {
        let rect = Rect::new(-50, 20, 1870, 1100);
        assert_eq!(rect.offset_by(EdgeOffsets::default()), rect);
    }

    #[test]
    fn default_rect_is_empty() {
        assert!(Rect::default().is_empty());
        assert!(!Rect::new(0, 0, 1, 1).is_empty());
    }

    #[test]
    fn inverted_rect_is_empty() {
        assert!(Rect::new(10, 10, 5, 20).is_empty());
        assert!(Rect::new(10, 10, 20, 5).is_empty());
    }
}
