//! Target window tracking and per-frame liveness validation.
//!
//! A handle captured at selection time can go stale in two ways: the window
//! is destroyed, or it is destroyed and the OS hands the same handle value to
//! an unrelated window later. The tracker therefore records the owning
//! process id at selection and re-validates both the handle and the pid every
//! frame; any mismatch reads as "target gone", which the scheduler treats as
//! a clean shutdown, not an error.

use crate::geometry::Rect;
use crate::host::TargetSelection;
use crate::platform::{WindowId, WindowServices};
use anyhow::{Result, anyhow};
use tracing::info;

/// The externally selected window the overlay follows.
#[derive(Default)]
pub struct TargetTracker {
    handle: Option<WindowId>,
    pid: u32,
}

impl TargetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a host-provided selection.
    ///
    /// Fails when the handle does not currently refer to a live window or
    /// when the reported pid does not match the window's actual owner.
    pub fn select<S: WindowServices>(&mut self, svc: &S, selection: TargetSelection) -> Result<()> {
        let window = WindowId(selection.handle);
        if !svc.is_window(window) {
            return Err(anyhow!(
                "selected handle {:#x} is not a window",
                selection.handle
            ));
        }
        let pid = svc.window_pid(window);
        if pid == 0 {
            return Err(anyhow!(
                "could not resolve owning process of {:#x}",
                selection.handle
            ));
        }
        self.handle = Some(window);
        self.pid = pid;
        info!(handle = format!("{:#x}", selection.handle), pid, "target selected");
        Ok(())
    }

    /// Per-frame liveness check. Fails safe: no selection, a destroyed
    /// window, or a recycled handle (owning pid changed) all return false.
    pub fn is_alive<S: WindowServices>(&self, svc: &S) -> bool {
        let Some(window) = self.handle else {
            return false;
        };
        if !svc.is_window(window) {
            return false;
        }
        svc.window_pid(window) == self.pid
    }

    /// The target's client area in screen coordinates; degenerate (empty)
    /// when no target is active or the query fails.
    pub fn client_rect<S: WindowServices>(&self, svc: &S) -> Rect {
        self.handle
            .and_then(|w| svc.client_rect_on_screen(w))
            .unwrap_or_default()
    }

    pub fn handle(&self) -> Option<WindowId> {
        self.handle
    }

    /// Drop the stored selection; a new `select` is required afterwards.
    pub fn invalidate(&mut self) {
        self.handle = None;
        self.pid = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::FakeServices;

    fn selection(handle: isize, pid: u32) -> TargetSelection {
        TargetSelection { handle, pid }
    }

    #[test]
    fn select_rejects_dead_handle() {
        let svc = FakeServices::default();
        let mut tracker = TargetTracker::new();
        assert!(tracker.select(&svc, selection(0x40, 120)).is_err());
        assert!(!tracker.is_alive(&svc));
    }

    #[test]
    fn never_selected_is_not_alive() {
        let svc = FakeServices::default();
        let tracker = TargetTracker::new();
        assert!(!tracker.is_alive(&svc));
        assert!(tracker.client_rect(&svc).is_empty());
    }

    #[test]
    fn live_target_round_trip() {
        let svc = FakeServices::default();
        svc.add_window(0x40, 120, "GameClass", Rect::new(10, 20, 810, 620));
        let mut tracker = TargetTracker::new();
        tracker.select(&svc, selection(0x40, 120)).unwrap();
        assert!(tracker.is_alive(&svc));
        assert_eq!(tracker.client_rect(&svc), Rect::new(10, 20, 810, 620));
    }

    #[test]
    fn destroyed_window_is_not_alive() {
        let svc = FakeServices::default();
        svc.add_window(0x40, 120, "GameClass", Rect::default());
        let mut tracker = TargetTracker::new();
        tracker.select(&svc, selection(0x40, 120)).unwrap();
        svc.remove_window(0x40);
        assert!(!tracker.is_alive(&svc));
        assert!(tracker.client_rect(&svc).is_empty());
    }

    #[test]
    fn recycled_handle_is_not_alive() {
        let svc = FakeServices::default();
        svc.add_window(0x40, 120, "GameClass", Rect::default());
        let mut tracker = TargetTracker::new();
        tracker.select(&svc, selection(0x40, 120)).unwrap();
        // Same handle value now belongs to a different process.
        svc.remove_window(0x40);
        svc.add_window(0x40, 999, "SomethingElse", Rect::default());
        assert!(!tracker.is_alive(&svc));
    }

    #[test]
    fn invalidate_requires_reselection() {
        let svc = FakeServices::default();
        svc.add_window(0x40, 120, "GameClass", Rect::default());
        let mut tracker = TargetTracker::new();
        tracker.select(&svc, selection(0x40, 120)).unwrap();
        tracker.invalidate();
        assert!(!tracker.is_alive(&svc));
        assert!(tracker.handle().is_none());
    }
}
