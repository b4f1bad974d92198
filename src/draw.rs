//! Drawing adapter: replays host draw commands onto a canvas.
//!
//! The canvas is the boundary to the actual rasterizer. The adapter's only
//! jobs are dispatching on the primitive kind and shifting content to cancel
//! the overlay window's randomized edge offsets, so annotations still land on
//! the right target pixels even though the window itself is deliberately
//! misaligned. Style values pass through unvalidated.

use crate::geometry::EdgeOffsets;
use crate::host::{DrawCommand, DrawKind};
use tracing::trace;

/// 2D primitive sink. Coordinates are overlay-window-local pixels.
pub trait Canvas {
    fn text(&mut self, x: i32, y: i32, color: [i32; 4], text: &str);
    fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, color: [i32; 4], thickness: i32);
    fn rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: [i32; 4], thickness: i32);
    fn rect_filled(&mut self, x: i32, y: i32, width: i32, height: i32, color: [i32; 4]);
    fn circle(&mut self, x: i32, y: i32, radius: i32, color: [i32; 4], thickness: i32);
    fn circle_filled(&mut self, x: i32, y: i32, radius: i32, color: [i32; 4]);
}

/// Issue one frame's commands against the canvas.
///
/// The window is positioned at the target rect plus `offsets`; drawing at
/// minus the left/top offset puts content back over the target's own origin.
pub fn replay<C: Canvas>(canvas: &mut C, commands: &[DrawCommand], offsets: EdgeOffsets) {
    let dx = -offsets.left;
    let dy = -offsets.top;
    for cmd in commands {
        let b = cmd.bounds;
        match cmd.kind {
            DrawKind::Text => canvas.text(b.left + dx, b.top + dy, cmd.color, &cmd.text),
            DrawKind::Line => canvas.line(
                b.left + dx,
                b.top + dy,
                b.right + dx,
                b.bottom + dy,
                cmd.color,
                cmd.thickness,
            ),
            DrawKind::Box => canvas.rect(
                b.left + dx,
                b.top + dy,
                b.right,
                b.bottom,
                cmd.color,
                cmd.thickness,
            ),
            DrawKind::BoxFilled => {
                canvas.rect_filled(b.left + dx, b.top + dy, b.right, b.bottom, cmd.color)
            }
            DrawKind::Circle => canvas.circle(
                b.left + dx,
                b.top + dy,
                b.right,
                cmd.color,
                cmd.thickness,
            ),
            DrawKind::CircleFilled => {
                canvas.circle_filled(b.left + dx, b.top + dy, b.right, cmd.color)
            }
        }
    }
}

/// Canvas that records primitives to the trace log. Stands in until a real
/// rasterizer backend is wired to the render target.
#[derive(Default)]
pub struct TraceCanvas;

impl Canvas for TraceCanvas {
    fn text(&mut self, x: i32, y: i32, color: [i32; 4], text: &str) {
        trace!(x, y, ?color, text, "text");
    }

    fn line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, color: [i32; 4], thickness: i32) {
        trace!(x1, y1, x2, y2, ?color, thickness, "line");
    }

    fn rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: [i32; 4], thickness: i32) {
        trace!(x, y, width, height, ?color, thickness, "rect");
    }

    fn rect_filled(&mut self, x: i32, y: i32, width: i32, height: i32, color: [i32; 4]) {
        trace!(x, y, width, height, ?color, "rect_filled");
    }

    fn circle(&mut self, x: i32, y: i32, radius: i32, color: [i32; 4], thickness: i32) {
        trace!(x, y, radius, ?color, thickness, "circle");
    }

    fn circle_filled(&mut self, x: i32, y: i32, radius: i32, color: [i32; 4]) {
        trace!(x, y, radius, ?color, "circle_filled");
    }
}
