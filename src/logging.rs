//! Logging setup
//!
//! Thin wrapper over `tracing-subscriber`. The supervisor itself only emits
//! coarse progress lines; the managed services write straight to the shared
//! console through their inherited handles and never pass through here.

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level falls back to
/// `info,devup=debug` (or full `debug` with `verbose`).
pub fn init(verbose: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info,devup=debug")
        }
    });

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_level(true)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
