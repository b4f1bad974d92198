//! Overlay window state: geometry synchronization and focus relevance.
//!
//! `OverlayPositioner` caches the last target rectangle it synced to and only
//! issues a reposition when the target actually moved or resized, so the
//! cross-process move call is not paid every frame. The comparison is a hard
//! equality check: any edge change triggers a full reposition, keeping the
//! overlay at most one frame behind the target.

use crate::geometry::{EdgeOffsets, Rect};
use crate::platform::{WindowId, WindowServices};
use tracing::debug;

/// Tracks where the overlay window was last placed relative to the target.
pub struct OverlayPositioner {
    offsets: EdgeOffsets,
    last_synced: Option<Rect>,
}

impl OverlayPositioner {
    pub fn new(offsets: EdgeOffsets) -> Self {
        Self {
            offsets,
            last_synced: None,
        }
    }

    pub fn offsets(&self) -> EdgeOffsets {
        self.offsets
    }

    /// Reposition the overlay over the target's client area if it changed
    /// since the last sync, applying the per-session edge offsets.
    ///
    /// Returns the overlay's new screen rectangle when a move was issued,
    /// `None` when nothing changed.
    pub fn sync_geometry<S: WindowServices>(
        &mut self,
        svc: &S,
        overlay: WindowId,
        target_rect: Rect,
    ) -> Option<Rect> {
        if self.last_synced == Some(target_rect) {
            return None;
        }
        self.last_synced = Some(target_rect);
        let overlay_rect = target_rect.offset_by(self.offsets);
        debug!(
            left = overlay_rect.left,
            top = overlay_rect.top,
            right = overlay_rect.right,
            bottom = overlay_rect.bottom,
            "overlay repositioned"
        );
        svc.move_window(overlay, overlay_rect);
        Some(overlay_rect)
    }
}

/// Whether either the target or the overlay itself currently holds focus,
/// judged by comparing window class names.
///
/// Degrades to "not relevant" on any failed class read, so a transient OS
/// failure costs one throttled iteration instead of a draw over the wrong
/// window. On a genuine mismatch the overlay's extended styles are
/// reasserted, since losing focus is when external code tends to strip the
/// non-activating, click-through flags.
pub fn is_focus_relevant<S: WindowServices>(
    svc: &S,
    overlay: WindowId,
    target: Option<WindowId>,
) -> bool {
    let Some(foreground) = svc.foreground_window() else {
        return false;
    };
    let Some(foreground_class) = svc.window_class(foreground) else {
        return false;
    };
    let Some(overlay_class) = svc.window_class(overlay) else {
        return false;
    };
    let target_class = target.and_then(|t| svc.window_class(t));
    if target_class.as_deref() != Some(foreground_class.as_str())
        && foreground_class != overlay_class
    {
        svc.reassert_overlay_styles(overlay);
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::FakeServices;

    const OVERLAY: WindowId = WindowId(0x10);
    const TARGET: WindowId = WindowId(0x40);

    fn svc_with_windows() -> FakeServices {
        let svc = FakeServices::default();
        svc.add_window(OVERLAY.0, 1, "Glasspane", Rect::default());
        svc.add_window(TARGET.0, 120, "GameClass", Rect::new(100, 100, 400, 300));
        svc
    }

    #[test]
    fn identical_rect_is_a_no_op() {
        let svc = svc_with_windows();
        let mut positioner = OverlayPositioner::new(EdgeOffsets::default());
        let rect = Rect::new(100, 100, 400, 300);
        assert!(positioner.sync_geometry(&svc, OVERLAY, rect).is_some());
        assert!(positioner.sync_geometry(&svc, OVERLAY, rect).is_none());
        assert_eq!(svc.moves.borrow().len(), 1);
    }

    #[test]
    fn changed_rect_issues_one_reposition_with_offsets() {
        let svc = svc_with_windows();
        let offsets = EdgeOffsets {
            left: 5,
            top: -3,
            right: 10,
            bottom: 0,
        };
        let mut positioner = OverlayPositioner::new(offsets);
        positioner
            .sync_geometry(&svc, OVERLAY, Rect::new(0, 0, 300, 200))
            .unwrap();
        let moved = positioner
            .sync_geometry(&svc, OVERLAY, Rect::new(100, 100, 400, 300))
            .expect("changed rect should reposition");
        assert_eq!(moved, Rect::new(105, 97, 410, 300));
        let moves = svc.moves.borrow();
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[1], (OVERLAY, moved));
    }

    #[test]
    fn single_edge_change_triggers_reposition() {
        let svc = svc_with_windows();
        let mut positioner = OverlayPositioner::new(EdgeOffsets::default());
        positioner.sync_geometry(&svc, OVERLAY, Rect::new(0, 0, 300, 200));
        assert!(
            positioner
                .sync_geometry(&svc, OVERLAY, Rect::new(0, 0, 301, 200))
                .is_some()
        );
    }

    #[test]
    fn focus_on_target_is_relevant() {
        let svc = svc_with_windows();
        svc.set_foreground(TARGET.0);
        assert!(is_focus_relevant(&svc, OVERLAY, Some(TARGET)));
        assert_eq!(svc.style_reasserts.get(), 0);
    }

    #[test]
    fn focus_on_overlay_is_relevant() {
        let svc = svc_with_windows();
        svc.set_foreground(OVERLAY.0);
        assert!(is_focus_relevant(&svc, OVERLAY, Some(TARGET)));
    }

    #[test]
    fn unrelated_foreground_reasserts_styles() {
        let svc = svc_with_windows();
        svc.add_window(0x99, 7, "Browser", Rect::default());
        svc.set_foreground(0x99);
        assert!(!is_focus_relevant(&svc, OVERLAY, Some(TARGET)));
        assert_eq!(svc.style_reasserts.get(), 1);
    }

    #[test]
    fn null_target_degrades_without_panicking() {
        let svc = svc_with_windows();
        svc.add_window(0x99, 7, "Browser", Rect::default());
        svc.set_foreground(0x99);
        assert!(!is_focus_relevant(&svc, OVERLAY, None));
    }

    #[test]
    fn failed_class_read_is_not_relevant() {
        let svc = svc_with_windows();
        // Foreground window exists but its class cannot be read.
        svc.windows.borrow_mut().insert(
            0x77,
            crate::platform::fake::FakeWindow {
                pid: 3,
                class: None,
                client_rect: Rect::default(),
            },
        );
        svc.set_foreground(0x77);
        assert!(!is_focus_relevant(&svc, OVERLAY, Some(TARGET)));
        // Read failure is a degrade, not a mismatch; styles stay untouched.
        assert_eq!(svc.style_reasserts.get(), 0);
    }
}
