use std::sync::Once;

use tracing::debug;
use tracing_subscriber::EnvFilter;

static INIT_EMBEDDED: Once = Once::new();

/// Target used for per-phase timings when profiling is enabled.
pub const PROFILE_TARGET: &str = "profile";

/// Default filter for the command line tool, `RUST_LOG` takes precedence.
pub fn cli_directives(debug: bool, verbosity: u8, profile: bool) -> String {
    let level = match (debug, verbosity) {
        (false, _) => "warn",
        (true, 0 | 1) => "debug",
        (true, _) => "trace",
    };

    if profile {
        format!("{},{}=info", level, PROFILE_TARGET)
    } else {
        level.to_owned()
    }
}

/// Logs go to stderr so they never mix with the progress line on stdout.
pub fn init_cli(debug: bool, verbosity: u8, profile: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli_directives(debug, verbosity, profile)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Logging for a host application embedding the renderer, only the first call has an effect.
pub fn init_embedded() {
    INIT_EMBEDDED.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init();

        debug!("embedded tracing initialized");
    });
}
