//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Filter directive for a run: `--verbose` wins, then the configured level,
/// then `info`.
pub fn directive(level: &str, verbose: bool) -> String {
    if verbose {
        "debug".to_string()
    } else if level.trim().is_empty() {
        "info".to_string()
    } else {
        level.trim().to_string()
    }
}

/// Build the filter. `RUST_LOG` takes precedence unless `--verbose` is set.
pub fn env_filter(level: &str, verbose: bool) -> EnvFilter {
    let fallback = directive(level, verbose);
    if verbose {
        return EnvFilter::new(fallback);
    }
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber, writing to stderr so stdout stays clean for
/// command output. Safe to call more than once; later calls are no-ops.
pub fn init(level: &str, json: bool, verbose: bool) {
    let filter = env_filter(level, verbose);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.with_ansi(false).try_init()
    };
}
