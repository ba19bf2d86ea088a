//! Log output setup for binaries embedding a bridge.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs a formatted subscriber filtered by `RUST_LOG`, falling back to `default_level`.
///
/// Returns an error if the filter is invalid or a global subscriber is already set.
pub fn try_init(default_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()?;
    Ok(())
}

/// Like [`try_init`] with `info` as the default, ignoring a subscriber that is already set.
pub fn init() {
    let _ = try_init("info");
}
