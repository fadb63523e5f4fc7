//! Diagnostic logging for the harness itself.
//!
//! Harness internals log through `tracing`; this installs a stderr `fmt`
//! subscriber. `CONFORM_LOG` takes `EnvFilter` directives and wins over the
//! verbosity-derived default. Test-body messages never go through here: they
//! belong to the recorder.

use tracing_subscriber::EnvFilter;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "CONFORM_LOG";

/// Default level for a verbosity count (`-v` repeats).
pub fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn filter(verbosity: u8) -> EnvFilter {
    std::env::var(LOG_ENV)
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level(verbosity)))
}

/// Installs the global subscriber. Calling it again is a no-op.
pub fn init(verbosity: u8) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbosity))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
