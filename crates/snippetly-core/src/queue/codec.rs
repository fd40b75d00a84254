//! Serialization boundary between [`QueuedAction`] and the local store.
//!
//! The stored form is a JSON array of records:
//!
//! ```json
//! [{ "id": "...", "type": "create_comment", "payload": { ... },
//!    "createdAt": 1714557600000, "ownerId": "..." }]
//! ```
//!
//! Records with an unknown `type` or a payload that does not match it decode to
//! [`ActionBody::Malformed`] and are written back unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::action::{ActionBody, ActionId, MalformedAction, OfflineAction, QueuedAction};
use crate::error::Result;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredAction {
    id: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    owner_id: String,
}

/// Encode a queue for storage
pub fn encode_actions(actions: &[QueuedAction]) -> Result<String> {
    let records = actions
        .iter()
        .map(StoredAction::try_from)
        .collect::<Result<Vec<_>>>()?;
    Ok(serde_json::to_string(&records)?)
}

/// Decode a stored queue.
///
/// Fails only when the document is not a JSON array. Array elements without a
/// string `id` cannot be addressed by `remove` and are skipped with a warning.
pub fn decode_actions(raw: &str) -> Result<Vec<QueuedAction>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let elements: Vec<Value> = serde_json::from_str(raw)?;
    let mut actions = Vec::with_capacity(elements.len());
    for (index, element) in elements.into_iter().enumerate() {
        match serde_json::from_value::<StoredAction>(element) {
            Ok(record) => actions.push(record.into()),
            Err(error) => {
                tracing::warn!("Skipping unreadable queue record #{}: {}", index, error);
            }
        }
    }
    Ok(actions)
}

impl TryFrom<&QueuedAction> for StoredAction {
    type Error = crate::Error;

    fn try_from(action: &QueuedAction) -> Result<Self> {
        let (kind, payload) = match &action.body {
            ActionBody::Ready(ready) => {
                let (kind, payload) = ready.to_parts()?;
                (kind.as_str().to_string(), payload)
            }
            ActionBody::Malformed(malformed) => (malformed.kind.clone(), malformed.payload.clone()),
        };

        Ok(Self {
            id: action.id.as_str().to_string(),
            kind,
            payload,
            created_at: action.created_at,
            owner_id: action.owner_id.clone(),
        })
    }
}

impl From<StoredAction> for QueuedAction {
    fn from(record: StoredAction) -> Self {
        let body = match OfflineAction::from_parts(&record.kind, record.payload.clone()) {
            Ok(action) => ActionBody::Ready(action),
            Err(error) => ActionBody::Malformed(MalformedAction {
                kind: record.kind,
                payload: record.payload,
                reason: error.to_string(),
            }),
        };

        Self {
            id: ActionId::from(record.id.as_str()),
            owner_id: record.owner_id,
            created_at: record.created_at,
            body,
        }
    }
}
