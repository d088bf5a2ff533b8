//! Console logging for the analysis pipeline
//!
//! Events go to stderr so that text pages written to stdout stay clean.
//! `RUST_LOG` overrides the level chosen here.

use anyhow::{Context as _, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Default filter directive for a verbosity flag
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

/// Initializes the global subscriber
///
/// # Errors
///
/// Returns error if the filter is invalid or a subscriber is already installed
pub fn init(verbose: bool) -> Result<()> {
    // Default to INFO (DEBUG when verbose), allow override with RUST_LOG
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(verbose)))
        .context("Failed to create env filter")?;

    let stderr_layer = fmt::layer()
        .with_target(verbose)
        .with_line_number(verbose)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!("Logging initialized");
    Ok(())
}
