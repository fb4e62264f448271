//! `serp-harvest list`: show the most recent stored results.

use crate::cli::search_cmd::print_results;
use crate::config::Config;
use crate::store::{ResultStore, SqliteResultStore};
use anyhow::{Context, Result};

/// Run the list command.
pub async fn run(limit: usize, json: bool) -> Result<()> {
    let config = Config::load()?;
    let store = SqliteResultStore::open(&config.database_path).with_context(|| {
        format!(
            "failed to open result store at {}",
            config.database_path.display()
        )
    })?;

    let results = store.list_recent(Some(limit)).await?;
    print_results(&results, json)
}
