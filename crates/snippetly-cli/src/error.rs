use std::io;

use snippetly_core::config::ConfigError;
use snippetly_core::remote::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] snippetly_core::Error),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Owner id cannot be empty")]
    EmptyOwner,
    #[error("No action payload provided")]
    EmptyPayload,
    #[error(
        "Sync is not configured. Set SUPABASE_URL and SUPABASE_ANON_KEY (and optionally SUPABASE_ACCESS_TOKEN)."
    )]
    SyncNotConfigured,
    #[error("{0} change(s) are still pending and will be retried on the next sync")]
    SyncIncomplete(usize),
}
