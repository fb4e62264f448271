//! `serp-harvest serve`: run the REST API.

use crate::cli::build_acquirer;
use crate::config::Config;
use crate::rest::{self, AppState};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Load configuration, wire the tiers and serve until interrupted.
pub async fn run(port: Option<u16>) -> Result<()> {
    let config = Config::load()?;
    let port = port.unwrap_or(config.port);

    info!("starting serp-harvest v{}", env!("CARGO_PKG_VERSION"));

    let acquirer = Arc::new(build_acquirer(&config)?);
    info!(
        database = %config.database_path.display(),
        browser_tier = acquirer.has_browser_tier(),
        deadline_ms = config.request_deadline.as_millis() as u64,
        "acquirer ready"
    );

    let state = AppState::new(acquirer, config.request_deadline);

    tokio::select! {
        result = rest::start(port, state) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
            Ok(())
        }
    }
}
