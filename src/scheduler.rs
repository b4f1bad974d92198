//! The main render loop: message pumping, exit conditions, idle throttling,
//! and frame pacing.
//!
//! One iteration is one `step`. The loop has four states; `ShuttingDown` is
//! terminal and the only state with cleanup obligations (surface teardown).
//! Per-frame OS call failures are never retried inside an iteration; the next
//! iteration's liveness and focus checks catch anything persistent.

use crate::config::OverlayConfig;
use crate::draw::{Canvas, replay};
use crate::host::Host;
use crate::overlay::{OverlayPositioner, is_focus_relevant};
use crate::platform::{WindowId, WindowServices};
use crate::render::Surface;
use crate::target::TargetTracker;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Sync-interval passed to Present while unfocused; blocks for several vsync
/// periods instead of spinning.
const UNFOCUSED_SYNC_INTERVAL: u32 = 4;
/// Additional sleep per unfocused iteration.
const UNFOCUSED_SLEEP: Duration = Duration::from_millis(250);
/// Measured cost of waking from an OS sleep; subtracted from the pacing
/// budget so the achieved period tracks the configured one.
const SLEEP_OVERHEAD: Duration = Duration::from_millis(1);
/// Never sleep zero; yields at least one scheduler tick.
const MIN_SLEEP: Duration = Duration::from_micros(1);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Unfocused,
    ShuttingDown,
}

/// How long to sleep after a frame that took `elapsed` out of `budget`.
fn pace_sleep(budget: Duration, elapsed: Duration) -> Duration {
    budget
        .saturating_sub(elapsed)
        .saturating_sub(SLEEP_OVERHEAD)
        .max(MIN_SLEEP)
}

/// Owns the loop state and drives all other components once per iteration.
pub struct Scheduler<'a, H, S, R, C>
where
    H: Host,
    S: WindowServices,
    R: Surface,
    C: Canvas,
{
    host: &'a H,
    svc: &'a S,
    surface: &'a mut R,
    canvas: &'a mut C,
    tracker: TargetTracker,
    positioner: OverlayPositioner,
    overlay: WindowId,
    config: OverlayConfig,
    state: LoopState,
}

impl<'a, H, S, R, C> Scheduler<'a, H, S, R, C>
where
    H: Host,
    S: WindowServices,
    R: Surface,
    C: Canvas,
{
    pub fn new(
        host: &'a H,
        svc: &'a S,
        surface: &'a mut R,
        canvas: &'a mut C,
        tracker: TargetTracker,
        overlay: WindowId,
        config: OverlayConfig,
    ) -> Self {
        let positioner = OverlayPositioner::new(config.offsets);
        Self {
            host,
            svc,
            surface,
            canvas,
            tracker,
            positioner,
            overlay,
            config,
            state: LoopState::Idle,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run until an exit condition fires, then tear the surface down.
    pub fn run(&mut self) {
        while self.state != LoopState::ShuttingDown {
            self.step();
        }
        self.surface.destroy();
        info!("render loop finished");
    }

    /// One loop iteration.
    pub fn step(&mut self) {
        let started = Instant::now();

        if self.svc.pump_messages() {
            info!("quit message received");
            self.state = LoopState::ShuttingDown;
            return;
        }
        if self.svc.key_just_pressed(self.config.quit_key) {
            info!("panic hotkey pressed");
            self.state = LoopState::ShuttingDown;
            return;
        }
        if !self.host.session_ok() {
            info!("host session ended");
            self.state = LoopState::ShuttingDown;
            return;
        }
        if !self.tracker.is_alive(self.svc) {
            info!("target window gone");
            self.tracker.invalidate();
            self.state = LoopState::ShuttingDown;
            return;
        }

        if !is_focus_relevant(self.svc, self.overlay, self.tracker.handle()) {
            self.state = LoopState::Unfocused;
            self.surface.clear();
            self.surface.present(UNFOCUSED_SYNC_INTERVAL);
            self.svc.sleep(UNFOCUSED_SLEEP);
            return;
        }

        self.state = LoopState::Running;
        let target_rect = self.tracker.client_rect(self.svc);
        if let Some(moved) = self.positioner.sync_geometry(self.svc, self.overlay, target_rect) {
            if let Err(e) = self
                .surface
                .resize(moved.width().max(0) as u32, moved.height().max(0) as u32)
            {
                warn!(error = %e, "surface resize failed");
            }
        }

        self.surface.clear();
        let commands = self.host.draw_commands();
        replay(self.canvas, &commands, self.positioner.offsets());
        self.surface.present(0);

        self.svc.sleep(pace_sleep(self.config.frame_budget, started.elapsed()));
    }
}
