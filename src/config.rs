//! Session configuration derived from the host snapshot and CLI overrides.
//!
//! Two pieces of arithmetic live here because they are easy to get wrong and
//! cheap to test: the target-FPS to frame-budget conversion (clamped to
//! [0, 1000] FPS, with 0 mapped to a minimal nonzero budget so the scheduler
//! never divides by zero) and the per-session random edge offsets drawn from
//! a configured range clamped to [-100, 100] pixels.

use crate::geometry::EdgeOffsets;
use crate::host::ConfigSnapshot;
use rand::Rng;
use std::time::Duration;

/// Widest permitted random-offset magnitude, matching the settings UI range.
const OFFSET_LIMIT: i32 = 100;

/// Resolved per-session configuration. Built once before the loop starts and
/// read without synchronization afterwards (single-threaded ownership).
#[derive(Clone, Debug)]
pub struct OverlayConfig {
    /// Hide the overlay from screen-capture APIs.
    pub stream_proof: bool,
    /// Verbose draw-command tracing; also disables capture exclusion so the
    /// overlay shows up in recordings while developing.
    pub debug: bool,
    /// Target duration of one frame, derived from the configured FPS.
    pub frame_budget: Duration,
    /// Per-session random edge offsets applied to the overlay geometry.
    pub offsets: EdgeOffsets,
    /// Virtual-key code of the panic hotkey.
    pub quit_key: i32,
}

impl OverlayConfig {
    /// Resolve a host snapshot into session configuration, drawing the random
    /// offsets from `rng`.
    pub fn from_snapshot(snapshot: &ConfigSnapshot, rng: &mut impl Rng) -> Self {
        Self {
            stream_proof: snapshot.stream_proof,
            debug: snapshot.debug,
            frame_budget: frame_budget_from_fps(snapshot.target_fps),
            offsets: random_edge_offsets(
                snapshot.random_offset_min,
                snapshot.random_offset_max,
                rng,
            ),
            quit_key: snapshot.quit_key,
        }
    }
}

/// Convert a target-FPS setting into a frame budget.
///
/// FPS is clamped to [0, 1000]; 0 yields a one-microsecond budget so the
/// pacing arithmetic stays well-defined when the user disables the cap.
pub fn frame_budget_from_fps(fps: i32) -> Duration {
    let fps = fps.clamp(0, 1000);
    if fps == 0 {
        Duration::from_micros(1)
    } else {
        Duration::from_micros(1_000_000 / fps as u64)
    }
}

/// Generate independent random offsets for each overlay edge.
///
/// The configured range may be inverted or out of bounds; it is normalized
/// and clamped to [-100, 100] before sampling.
pub fn random_edge_offsets(min: i32, max: i32, rng: &mut impl Rng) -> EdgeOffsets {
    let lo = min.min(max).clamp(-OFFSET_LIMIT, OFFSET_LIMIT);
    let hi = max.max(min).clamp(lo, OFFSET_LIMIT);
    EdgeOffsets {
        left: rng.gen_range(lo..=hi),
        top: rng.gen_range(lo..=hi),
        right: rng.gen_range(lo..=hi),
        bottom: rng.gen_range(lo..=hi),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn frame_budget_positive_for_entire_fps_range() {
        for fps in 0..=1000 {
            let budget = frame_budget_from_fps(fps);
            assert!(budget > Duration::ZERO, "fps {fps} produced zero budget");
        }
    }

    #[test]
    fn fps_zero_yields_minimal_budget() {
        assert_eq!(frame_budget_from_fps(0), Duration::from_micros(1));
    }

    #[test]
    fn fps_out_of_range_is_clamped() {
        assert_eq!(frame_budget_from_fps(5000), frame_budget_from_fps(1000));
        assert_eq!(frame_budget_from_fps(-20), frame_budget_from_fps(0));
    }

    #[test]
    fn typical_fps_budget() {
        assert_eq!(frame_budget_from_fps(250), Duration::from_micros(4000));
    }

    #[test]
    fn offsets_stay_within_configured_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let offsets = random_edge_offsets(-10, 10, &mut rng);
            for v in [offsets.left, offsets.top, offsets.right, offsets.bottom] {
                assert!((-10..=10).contains(&v));
            }
        }
    }

    #[test]
    fn inverted_range_is_normalized() {
        let mut rng = StdRng::seed_from_u64(7);
        let offsets = random_edge_offsets(10, -10, &mut rng);
        for v in [offsets.left, offsets.top, offsets.right, offsets.bottom] {
            assert!((-10..=10).contains(&v));
        }
    }

    #[test]
    fn extreme_range_is_clamped_without_panicking() {
        let mut rng = StdRng::seed_from_u64(7);
        let offsets = random_edge_offsets(-5000, 5000, &mut rng);
        for v in [offsets.left, offsets.top, offsets.right, offsets.bottom] {
            assert!((-100..=100).contains(&v));
        }
        // Both bounds beyond the limit on the same side collapse to the limit.
        let offsets = random_edge_offsets(150, 160, &mut rng);
        assert_eq!(
            offsets,
            EdgeOffsets {
                left: 100,
                top: 100,
                right: 100,
                bottom: 100
            }
        );
    }

    #[test]
    fn snapshot_resolution_applies_all_fields() {
        let mut rng = StdRng::seed_from_u64(1);
        let snapshot = ConfigSnapshot {
            stream_proof: false,
            debug: true,
            target_fps: 60,
            random_offset_min: 0,
            random_offset_max: 0,
            quit_key: 0x23,
        };
        let config = OverlayConfig::from_snapshot(&snapshot, &mut rng);
        assert!(!config.stream_proof);
        assert!(config.debug);
        assert_eq!(config.frame_budget, Duration::from_micros(16_666));
        assert_eq!(config.offsets, EdgeOffsets::default());
        assert_eq!(config.quit_key, 0x23);
    }
}
