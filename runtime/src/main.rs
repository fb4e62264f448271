// Copyright 2026 serp-harvest Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use serp_harvest::cli;

#[derive(Parser)]
#[command(
    name = "serp-harvest",
    about = "serp-harvest: keyword search results via headless browser with API fallback",
    version,
    after_help = "Run 'serp-harvest <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable), including logs
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the REST API
    Serve {
        /// Listen port (overrides PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one acquisition for a keyword and print the saved results
    Search {
        /// Keyword to search for
        keyword: String,
        /// Skip the browser tier
        #[arg(long)]
        api_only: bool,
    },
    /// List the most recent stored results
    List {
        /// Maximum number of results
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::init_tracing(cli.verbose, cli.json);

    let result = match cli.command {
        Commands::Serve { port } => cli::start::run(port).await,
        Commands::Search { keyword, api_only } => {
            cli::search_cmd::run(&keyword, api_only, cli.json).await
        }
        Commands::List { limit } => cli::list_cmd::run(limit, cli.json).await,
        Commands::Doctor => cli::doctor::run().await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "serp-harvest", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if cli.json {
            println!(
                "{}",
                serde_json::json!({ "error": true, "message": format!("{e:#}") })
            );
        } else {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
