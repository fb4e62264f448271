//! CLI subcommand implementations for the `serp-harvest` binary.

pub mod doctor;
pub mod list_cmd;
pub mod search_cmd;
pub mod start;

use crate::acquisition::{Acquirer, BrowserHarvester, CustomSearchClient};
use crate::config::Config;
use crate::renderer::chromium::ChromiumRenderer;
use crate::store::SqliteResultStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. Logs go to stderr.
pub fn init_tracing(verbose: bool, json: bool) {
    let directive = if verbose {
        "serp_harvest=debug"
    } else {
        "serp_harvest=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Open the store and wire both tiers from configuration.
///
/// The browser tier is attached only when enabled and a Chromium binary is
/// found; otherwise the acquirer runs API-only.
pub fn build_acquirer(config: &Config) -> Result<Acquirer> {
    let store = SqliteResultStore::open(&config.database_path).with_context(|| {
        format!(
            "failed to open result store at {}",
            config.database_path.display()
        )
    })?;

    let api = CustomSearchClient::new(&config.api_key, &config.engine_id, config.api_timeout)
        .with_endpoint(&config.search_endpoint)
        .with_result_cap(config.result_cap);

    let acquirer = Acquirer::new(Arc::new(store), Arc::new(api));

    if !config.browser_enabled {
        info!("browser tier disabled by configuration");
        return Ok(acquirer);
    }

    match ChromiumRenderer::discover(config.chromium_path.as_deref()) {
        Ok(renderer) => {
            info!(path = %renderer.chrome_path().display(), "Chromium renderer initialized");
            let mut harvester = BrowserHarvester::new(Arc::new(renderer), config.profile.clone());
            if let Some(dir) = &config.screenshot_dir {
                harvester = harvester.with_screenshot_dir(dir);
            }
            Ok(acquirer.with_browser_tier(Arc::new(harvester)))
        }
        Err(e) => {
            warn!("Failed to initialize Chromium: {e:#}");
            warn!("Running in API-only mode (no browser tier)");
            Ok(acquirer)
        }
    }
}
