//! Environment readiness check.

use crate::config::{default_database_path, Config};
use crate::renderer::chromium::find_chromium;
use crate::store::{ResultStore, SqliteResultStore};
use anyhow::{bail, Result};
use std::path::PathBuf;

/// Check configuration, Chromium availability and store reachability.
pub async fn run() -> Result<()> {
    println!("serp-harvest Doctor");
    println!("===================");
    println!();

    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    println!("OS:   {os}");
    println!("Arch: {arch}");
    println!();

    let config = match Config::load() {
        Ok(config) => {
            println!("[OK] Configuration valid");
            Some(config)
        }
        Err(e) => {
            println!("[!!] Configuration invalid: {e}");
            None
        }
    };

    let explicit = config.as_ref().and_then(|c| c.chromium_path.clone());
    let browser_enabled = config.as_ref().map_or(true, |c| c.browser_enabled);
    match find_chromium(explicit.as_deref()) {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None if browser_enabled => {
            println!("[!!] Chromium NOT found. Searches will use the API tier only.")
        }
        None => println!("[--] Chromium not found (browser tier disabled)"),
    }
    if !browser_enabled {
        println!("[--] Browser tier disabled by SERP_BROWSER");
    }

    let db_path: PathBuf = config
        .as_ref()
        .map(|c| c.database_path.clone())
        .unwrap_or_else(default_database_path);
    let store_ok = match check_store(&db_path).await {
        Ok(rows) => {
            println!("[OK] Result store {} ({rows} rows)", db_path.display());
            true
        }
        Err(e) => {
            println!("[!!] Result store {} unreachable: {e:#}", db_path.display());
            false
        }
    };

    if let Some(dir) = config.as_ref().and_then(|c| c.screenshot_dir.as_ref()) {
        if dir.is_dir() {
            println!("[OK] Screenshot directory {}", dir.display());
        } else {
            println!("[??] Screenshot directory {} does not exist yet", dir.display());
        }
    }

    println!();
    if config.is_some() && store_ok {
        println!("Status: READY");
        Ok(())
    } else {
        println!("Status: NOT READY");
        bail!("environment check failed")
    }
}

async fn check_store(path: &std::path::Path) -> Result<u64> {
    let store = SqliteResultStore::open(path)?;
    store.list_recent(Some(1)).await?;
    Ok(store.count().await?)
}
