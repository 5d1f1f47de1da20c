//! Headless medialink client: keeps a socket to the media server open and
//! logs the notifications it is configured to follow.

mod app;
mod config;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
const DEFAULT_LOG_FILTER: &str = "info,medialink_connection=info";

fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = config::Config::load().context("failed to load client config")?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        server = %config.server_url,
        kinds = config.subscribe.len(),
        "medialink client"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("medialink")
        .build()
        .context("failed to build async runtime")?;
    runtime.block_on(app::run(config))?;

    tracing::debug!("runtime stopped");
    Ok(())
}
