//! Snippetly CLI - inspect and replay the offline change queue
//!
//! Shares the queue format and sync driver with the Snippetly clients, so it can
//! be pointed at the same local store to debug pending changes.

mod cli;
mod commands;
mod error;


use clap::Parser;
use snippetly_core::config::SnippetlyConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, QueueCommands};
use crate::commands::common::{open_queue, resolve_store_path};
use crate::commands::queue::{run_queue_add, run_queue_clear, run_queue_list};
use crate::commands::sync::run_sync;
use crate::commands::threads::run_threads;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = SnippetlyConfig::from_env()?;
    let store_path = resolve_store_path(cli.store_path, &config);

    match cli.command {
        Commands::Queue { command } => {
            let queue = open_queue(&store_path, &config)?;
            match command {
                QueueCommands::List { json } => run_queue_list(&queue, json)?,
                QueueCommands::Add {
                    owner,
                    kind,
                    payload,
                } => run_queue_add(&queue, &owner, &kind, &payload)?,
                QueueCommands::Clear => run_queue_clear(&queue)?,
            }
        }
        Commands::Sync { json } => run_sync(&config, &store_path, json).await?,
        Commands::Threads { file, order, json } => run_threads(&file, order.into(), json)?,
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env();
    let filter = match "snippetly=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
