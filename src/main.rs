//! Transparent, click-through annotation overlay.
//!
//! This binary creates a topmost, capture-excluded window over a target
//! application window selected by an external assistance host, then renders
//! the host's draw commands at a configured frame rate while tracking the
//! target's geometry and focus state.
//!
//! High-level flow:
//! 1. Parse CLI and initialize tracing.
//! 2. Verify the host session is healthy; bail with a user-facing message
//!    and exit code -1 if not.
//! 3. Attempt UIAccess elevation (relaunches the process on success; a
//!    failure degrades to the plain desktop z-band).
//! 4. Resolve the session configuration, validate the host's target window
//!    selection, and create the overlay window (refusing to run twice).
//! 5. Create the D3D11 surface, hardware first with a WARP fallback.
//! 6. Run the frame loop until the target closes, the host disconnects, or
//!    the user quits (panic hotkey, Ctrl+C, or WM_QUIT).

mod bridge;
mod config;
mod draw;
mod elevate;
mod geometry;
mod host;
mod logging;
mod overlay;
mod platform;
mod render;
mod scheduler;
mod target;
mod window;

use bridge::BridgeHost;
use clap::{ArgAction, Parser};
use config::OverlayConfig;
use draw::TraceCanvas;
use host::Host;
use platform::Win32Services;
use render::D3D11Surface;
use scheduler::Scheduler;
use target::TargetTracker;
use tracing::{error, info, warn};
use window::{Band, OverlayWindow, WindowError, alert};
use windows::Win32::Foundation::{LPARAM, WPARAM};
use windows::Win32::Media::{timeBeginPeriod, timeEndPeriod};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{PostThreadMessageW, WM_QUIT};

/// Exit code for startup precondition failures (no host session, no valid
/// target, duplicate instance).
const EXIT_PRECONDITION: i32 = -1;

const APP_TITLE: &str = "Glasspane";

/// Command line interface definition.
#[derive(Parser, Debug)]
#[command(
    version,
    about = concat!(
        env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"),
        " - Transparent click-through overlay for host-supplied annotations.",
    )
)]
struct Cli {
    /// Debug mode: keep the overlay visible to capture APIs and trace every
    /// draw command.
    #[arg(long)]
    debug: bool,
    /// Override the host-configured target frame rate (0-1000; 0 uncaps).
    #[arg(long)]
    fps: Option<i32>,
    /// Increase verbosity (-v=debug, -vv=trace). Overrides RUST_LOG.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
    /// Quiet mode: only warnings and errors. Overrides -v and RUST_LOG.
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    logging::configure_logging(cli.quiet, cli.verbose);
    info!(version = env!("CARGO_PKG_VERSION"), "starting glasspane");

    let host = BridgeHost::new();
    if !host.session_ok() {
        alert(APP_TITLE, "No assistance host session is available.");
        std::process::exit(EXIT_PRECONDITION);
    }

    // Relaunches under a UIAccess token and exits when it can; any failure
    // just drops the overlay into the normal desktop band.
    let elevation = elevate::ensure_elevated();

    let snapshot = host.config();
    let mut config = OverlayConfig::from_snapshot(&snapshot, &mut rand::thread_rng());
    if cli.debug {
        config.debug = true;
    }
    if let Some(fps) = cli.fps {
        config.frame_budget = config::frame_budget_from_fps(fps);
    }

    let svc = Win32Services;
    let mut tracker = TargetTracker::new();
    let Some(selection) = host.target_selection() else {
        alert(APP_TITLE, "The host has no target window selected.");
        std::process::exit(EXIT_PRECONDITION);
    };
    if let Err(e) = tracker.select(&svc, selection) {
        error!(error = %e, "target selection rejected");
        alert(APP_TITLE, "The selected target window is no longer valid.");
        std::process::exit(EXIT_PRECONDITION);
    }

    let band = Band::for_elevation(elevation);
    let mut overlay_window = match OverlayWindow::create(band, config.stream_proof, config.debug) {
        Ok(w) => w,
        Err(WindowError::AlreadyRunning) => {
            alert(APP_TITLE, "Another overlay instance is already running.");
            std::process::exit(EXIT_PRECONDITION);
        }
        Err(e) => {
            error!(error = %e, "overlay window creation failed");
            alert(APP_TITLE, "The overlay window could not be created.");
            std::process::exit(EXIT_PRECONDITION);
        }
    };

    let target_rect = tracker.client_rect(&svc);
    let mut surface = match D3D11Surface::create(
        overlay_window.id(),
        target_rect.width().max(1) as u32,
        target_rect.height().max(1) as u32,
    ) {
        Ok(s) => s,
        Err(e) => {
            // Fatal to this session only; exits cleanly without the loop.
            error!(error = %e, "render surface creation failed");
            alert(APP_TITLE, "The graphics device could not be created.");
            return;
        }
    };

    // Ctrl+C -> graceful quit (must post WM_QUIT to the loop's thread;
    // PostQuitMessage on the handler thread is ineffective).
    let main_tid = unsafe { GetCurrentThreadId() };
    ctrlc::set_handler(move || {
        info!("Ctrl+C received, shutting down");
        unsafe {
            let _ = PostThreadMessageW(main_tid, WM_QUIT, WPARAM(0), LPARAM(0));
        }
    })
    .expect("ctrlc handler");

    // 1ms timer resolution keeps the pacing sleeps close to their requested
    // durations for the duration of the loop.
    if unsafe { timeBeginPeriod(1) } != 0 {
        warn!("could not raise timer resolution, frame pacing will be coarse");
    }

    let mut canvas = TraceCanvas;
    let mut scheduler = Scheduler::new(
        &host,
        &svc,
        &mut surface,
        &mut canvas,
        tracker,
        overlay_window.id(),
        config,
    );
    scheduler.run();

    unsafe {
        let _ = timeEndPeriod(1);
    }
    overlay_window.destroy();
    info!("glasspane exiting");
}
