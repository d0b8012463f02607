//! Diagnostic logging to stderr.
//!
//! Library code logs through `tracing`; this installs the subscriber the
//! binary uses. `-v` enables debug logs, `-vv` trace logs and `-q` silences
//! them. Without either flag, `RUST_LOG` is honoured.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// The filter for the given `-v` count and `-q` flag.
pub(crate) fn filter(verbose: u8, quiet: bool) -> EnvFilter {
    if quiet {
        return EnvFilter::new("off");
    }
    match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("setup2toml=debug"),
        _ => EnvFilter::new("trace"),
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub(crate) fn setup_logging(verbose: u8, quiet: bool) {
    let formatter = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let _ = tracing_subscriber::registry()
        .with(formatter)
        .with(filter(verbose, quiet))
        .try_init();
}
