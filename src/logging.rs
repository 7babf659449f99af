//! Diagnostics for the command line tool.
//!
//! Protocol and discovery output go to stdout (or `-o`); diagnostics always
//! go to stderr so the two never mix.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset, by number of `-v` flags.
fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "specline=info",
        2 => "specline=debug",
        _ => "specline=trace",
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `verbose`.
///
/// ```bash
/// RUST_LOG=specline::progress=debug specline report run.ndjson
/// ```
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    // A second init (e.g. from tests) leaves the first subscriber in place.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_crate_level() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(2), "specline=debug");
        assert_eq!(default_directive(9), "specline=trace");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init(0);
        init(1);
    }
}
