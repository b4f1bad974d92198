//! Tracing subscriber setup from CLI verbosity flags.

use tracing::Level;

/// Configure the tracing subscriber according to `-q` / `-v` occurrences.
///
/// Precedence:
/// 1. `quiet` forces WARN+.
/// 2. `-vv` => TRACE.
/// 3. `-v`  => DEBUG.
/// 4. Else INFO with optional `RUST_LOG` env filter overrides.
pub fn configure_logging(quiet: bool, verbose: u8) {
    let builder = tracing_subscriber::fmt::Subscriber::builder();
    if quiet {
        builder.with_max_level(Level::WARN).init();
    } else if verbose > 1 {
        builder.with_max_level(Level::TRACE).init();
    } else if verbose == 1 {
        builder.with_max_level(Level::DEBUG).init();
    } else {
        builder
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_max_level(Level::INFO)
            .init();
    }
}
