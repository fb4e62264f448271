//! `serp-harvest search <keyword>`: one acquisition from the command line.

use crate::cli::build_acquirer;
use crate::config::Config;
use crate::model::SearchResult;
use anyhow::Result;

/// Run the search command and print the saved records.
pub async fn run(keyword: &str, api_only: bool, json: bool) -> Result<()> {
    let config = Config::load()?;
    let acquirer = build_acquirer(&config)?;

    let use_browser = !api_only;
    let results = acquirer
        .acquire_with_deadline(keyword, use_browser, config.request_deadline)
        .await?;

    print_results(&results, json)
}

/// Print records as a JSON array or as one line per record.
pub fn print_results(results: &[SearchResult], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for r in results {
        println!(
            "{:>6}  {}  {:<20}  {}",
            r.id,
            r.created_at.format("%Y-%m-%d %H:%M:%S"),
            r.keyword,
            r.url
        );
    }
    println!("\n{} result(s)", results.len());
    Ok(())
}
