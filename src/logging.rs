//! Logging setup for the linktag binary.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "linktag=warn";
const VERBOSE_LOG_FILTER: &str = "linktag=debug";

/// Initialize tracing to stderr.
///
/// `RUST_LOG` wins when set; otherwise `verbose` picks between warnings only
/// and debug output.
pub fn init_logging(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            VERBOSE_LOG_FILTER
        } else {
            DEFAULT_LOG_FILTER
        })
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time()
                .with_filter(filter),
        )
        .try_init()
        .context("Failed to install the tracing subscriber")?;

    Ok(())
}
