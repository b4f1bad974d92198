//! Companion-host boundary types.
//!
//! The overlay consumes four things from the assistance host: a session
//! status (any non-ok answer shuts the loop down), a target-window selection,
//! a configuration snapshot, and a per-frame draw-command feed. The `Host`
//! trait is the seam the scheduler calls through; `bridge::BridgeHost` is the
//! production implementation and the tests substitute scripted fakes.
//!
//! Draw commands are passed through untouched: the core only inspects the
//! primitive kind in order to dispatch, and forwards colors, thickness, and
//! extents to the canvas as-is.

use crate::geometry::Rect;

/// Primitive kind tag of one host draw command.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DrawKind {
    Text,
    Line,
    Box,
    BoxFilled,
    Circle,
    CircleFilled,
}

/// One host-supplied draw command.
///
/// Interpretation of `bounds` depends on the kind:
/// * `Text`: left/top anchor the baseline origin.
/// * `Line`: (left, top) and (right, bottom) are the two endpoints.
/// * `Box`/`BoxFilled`: left/top is the origin, right/bottom carry
///   width/height.
/// * `Circle`/`CircleFilled`: left/top is the center, right is the radius.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawCommand {
    pub kind: DrawKind,
    /// RGBA components, forwarded without range validation.
    pub color: [i32; 4],
    /// Stroke thickness for outlined primitives.
    pub thickness: i32,
    pub bounds: Rect,
    /// Label payload; empty for non-text primitives.
    pub text: String,
}

/// Window handle and owning process id reported by the host's target query.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TargetSelection {
    pub handle: isize,
    pub pid: u32,
}

/// Saved overlay settings fetched from the host at session start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub stream_proof: bool,
    pub debug: bool,
    pub target_fps: i32,
    pub random_offset_min: i32,
    pub random_offset_max: i32,
    pub quit_key: i32,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            stream_proof: true,
            debug: false,
            target_fps: 250,
            random_offset_min: 0,
            random_offset_max: 0,
            // VK_END
            quit_key: 0x23,
        }
    }
}

/// External assistance host, queried once per frame.
pub trait Host {
    /// Whether the host session is healthy. Any failure cause is treated
    /// identically by the caller (clean shutdown).
    fn session_ok(&self) -> bool;

    /// The host's current target selection; `None` when the host reports no
    /// calibrated target (zero handle or zero pid).
    fn target_selection(&self) -> Option<TargetSelection>;

    /// Saved overlay settings; implementations fall back to defaults when the
    /// host cannot be queried.
    fn config(&self) -> ConfigSnapshot;

    /// The draw commands for one frame. A restartable sequence: the host
    /// rebuilds it every call.
    fn draw_commands(&self) -> Vec<DrawCommand>;
}
