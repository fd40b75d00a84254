use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use snippetly_core::RootOrder;

#[derive(Parser)]
#[command(name = "snippetly")]
#[command(about = "Inspect and replay Snippetly's offline change queue")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local queue database
    #[arg(long, global = true, value_name = "PATH")]
    pub store_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage pending offline changes
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Replay pending changes against the configured Supabase project
    Sync {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render comment threads from a JSON array of comments
    Threads {
        /// Path to the comments file (`-` for stdin)
        file: PathBuf,
        /// Order of top-level comments
        #[arg(long, value_enum, default_value_t = ThreadOrder::Newest)]
        order: ThreadOrder,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// List pending changes, oldest first
    #[command(alias = "ls")]
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Queue a change by hand
    Add {
        /// User that made the change
        #[arg(long)]
        owner: String,
        /// Action type, e.g. `create_snippet` or `rate-snippet`
        #[arg(long)]
        kind: String,
        /// JSON payload (`-` reads it from stdin)
        #[arg(long)]
        payload: String,
    },
    /// Drop every pending change without syncing it
    Clear,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ThreadOrder {
    Newest,
    Oldest,
}

impl From<ThreadOrder> for RootOrder {
    fn from(order: ThreadOrder) -> Self {
        match order {
            ThreadOrder::Newest => Self::NewestFirst,
            ThreadOrder::Oldest => Self::OldestFirst,
        }
    }
}
