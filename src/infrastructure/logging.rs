//! Logging system initialization
//!
//! Console-only tracing setup with env-filter based level control
//! (`RUST_LOG`), defaulting to `info` for the crawl progress lines.

use anyhow::Result;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Initialize the logging system.
///
/// Safe to call once per process; a second call fails because the global
/// subscriber is already set.
pub fn init_logging() -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stdout);

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .try_init()?;

    Ok(())
}
