use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use snippetly_core::config::SnippetlyConfig;
use snippetly_core::queue::ActionBody;
use snippetly_core::store::SqliteStore;
use snippetly_core::{OfflineQueue, QueuedAction};
use serde::Serialize;
use serde_json::Value;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct QueueListItem {
    pub id: String,
    pub kind: String,
    pub owner_id: String,
    pub created_at: i64,
    pub created_at_iso: String,
    pub payload: Value,
    /// Why the entry cannot be replayed, for entries written by a newer client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub malformed: Option<String>,
}

pub fn queued_action_to_item(action: &QueuedAction) -> Result<QueueListItem, CliError> {
    let (payload, malformed) = match &action.body {
        ActionBody::Ready(ready) => (ready.to_parts()?.1, None),
        ActionBody::Malformed(malformed) => {
            (malformed.payload.clone(), Some(malformed.reason.clone()))
        }
    };

    Ok(QueueListItem {
        id: action.id.to_string(),
        kind: action.kind_label().to_string(),
        owner_id: action.owner_id.clone(),
        created_at: action.created_at,
        created_at_iso: format_timestamp(action.created_at),
        payload,
        malformed,
    })
}

pub fn format_queue_lines(actions: &[QueuedAction], now_ms: i64) -> Vec<String> {
    actions
        .iter()
        .enumerate()
        .map(|(index, action)| {
            let marker = match &action.body {
                ActionBody::Ready(_) => String::new(),
                ActionBody::Malformed(malformed) => format!(" [unreplayable: {}]", malformed.reason),
            };
            format!(
                "{:>3}. {} {:<15} owner={} ({}){}",
                index + 1,
                short_id(action.id.as_str()),
                action.kind_label(),
                action.owner_id,
                format_relative_time(action.created_at, now_ms),
                marker
            )
        })
        .collect()
}

/// First eight characters of an id, enough to tell entries apart in a listing
pub fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(index, _)| &id[..index])
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Read a value given on the command line, where `-` means stdin
pub fn read_argument_or_stdin(raw: &str) -> Result<Option<String>, CliError> {
    let value = if raw.trim() == "-" {
        read_piped_stdin()?
    } else {
        Some(raw.to_string())
    };
    Ok(value.and_then(|text| normalize_content(&text)))
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.read_to_string(&mut buffer)?;
    Ok(Some(buffer))
}

pub fn resolve_store_path(cli_store_path: Option<PathBuf>, config: &SnippetlyConfig) -> PathBuf {
    cli_store_path
        .or_else(|| config.store_path.clone())
        .unwrap_or_else(default_store_path)
}

pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("snippetly")
        .join("offline.db")
}

pub fn open_queue(
    path: &Path,
    config: &SnippetlyConfig,
) -> Result<OfflineQueue<SqliteStore>, CliError> {
    let store = SqliteStore::open(path)?;
    tracing::debug!("Opened offline store at {}", path.display());
    Ok(OfflineQueue::new(store, config.queue_key.clone()))
}
