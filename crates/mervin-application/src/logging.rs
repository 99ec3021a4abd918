//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the log filter (e.g. `MERVIN_LOG=history=debug`).
pub const LOG_ENV: &str = "MERVIN_LOG";

/// Installs the global subscriber with the `info` default filter.
pub fn init_tracing() {
    init_tracing_with_default("info");
}

/// Installs the global subscriber, using `default_filter` when `MERVIN_LOG`
/// is unset or unparsable.
///
/// Calling this more than once is harmless; later calls leave the first
/// subscriber in place.
pub fn init_tracing_with_default(default_filter: &str) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init();

    if result.is_err() {
        tracing::debug!(target: "logging", "Subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing_with_default("warn");
        init_tracing();
    }
}
