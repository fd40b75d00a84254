use snippetly_core::queue::ActionKind;
use snippetly_core::store::LocalStore;
use snippetly_core::{OfflineAction, OfflineQueue};
use serde_json::Value;

use crate::commands::common::{
    format_queue_lines, normalize_content, now_millis, queued_action_to_item,
    read_argument_or_stdin, QueueListItem,
};
use crate::error::CliError;

pub fn run_queue_list<S: LocalStore>(queue: &OfflineQueue<S>, as_json: bool) -> Result<(), CliError> {
    let pending = queue.list_pending();

    if as_json {
        let json_items = pending
            .iter()
            .map(queued_action_to_item)
            .collect::<Result<Vec<QueueListItem>, CliError>>()?;
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if pending.is_empty() {
        println!("No pending changes.");
        return Ok(());
    }

    for line in format_queue_lines(&pending, now_millis()) {
        println!("{line}");
    }
    Ok(())
}

pub fn run_queue_add<S: LocalStore>(
    queue: &OfflineQueue<S>,
    owner: &str,
    kind: &str,
    payload: &str,
) -> Result<(), CliError> {
    let payload = read_argument_or_stdin(payload)?.ok_or(CliError::EmptyPayload)?;
    let kind = enqueue_from_args(queue, owner, kind, &payload)?;
    println!("Queued {kind} ({} pending)", queue.len());
    Ok(())
}

/// Validate a hand-written action and append it to the queue
pub fn enqueue_from_args<S: LocalStore>(
    queue: &OfflineQueue<S>,
    owner: &str,
    kind: &str,
    payload: &str,
) -> Result<ActionKind, CliError> {
    let owner = normalize_content(owner).ok_or(CliError::EmptyOwner)?;
    let payload: Value = serde_json::from_str(payload)?;
    let action = OfflineAction::from_parts(kind, payload)?;
    action.validate()?;

    let kind = action.kind();
    queue.enqueue(owner, action);
    Ok(kind)
}

pub fn run_queue_clear<S: LocalStore>(queue: &OfflineQueue<S>) -> Result<(), CliError> {
    let count = queue.len();
    queue.clear_all()?;
    if count == 0 {
        println!("No pending changes.");
    } else {
        println!("Dropped {count} pending change(s)");
    }
    Ok(())
}
