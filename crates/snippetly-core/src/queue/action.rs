//! Queued write intents

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{NewComment, NewSnippet, Rating, SnippetId, SnippetUpdate};

/// Identifier of a queued action.
///
/// Freshly generated ids are UUID v7, so they sort by enqueue time and never
/// collide within a queue. Ids read back from storage are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(String);

impl ActionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The closed set of action kinds the queue knows how to replay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    CreateSnippet,
    UpdateSnippet,
    DeleteSnippet,
    CreateComment,
    RateSnippet,
}

impl ActionKind {
    pub const ALL: [Self; 5] = [
        Self::CreateSnippet,
        Self::UpdateSnippet,
        Self::DeleteSnippet,
        Self::CreateComment,
        Self::RateSnippet,
    ];

    /// Wire name, as stored in the `type` field
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateSnippet => "create_snippet",
            Self::UpdateSnippet => "update_snippet",
            Self::DeleteSnippet => "delete_snippet",
            Self::CreateComment => "create_comment",
            Self::RateSnippet => "rate_snippet",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown action type: {s}")))
    }
}

/// A write performed while offline, with its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum OfflineAction {
    CreateSnippet(NewSnippet),
    UpdateSnippet {
        id: SnippetId,
        updates: SnippetUpdate,
    },
    DeleteSnippet {
        id: SnippetId,
    },
    CreateComment(NewComment),
    RateSnippet(Rating),
}

impl OfflineAction {
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::CreateSnippet(_) => ActionKind::CreateSnippet,
            Self::UpdateSnippet { .. } => ActionKind::UpdateSnippet,
            Self::DeleteSnippet { .. } => ActionKind::DeleteSnippet,
            Self::CreateComment(_) => ActionKind::CreateComment,
            Self::RateSnippet(_) => ActionKind::RateSnippet,
        }
    }

    /// Rebuild an action from its stored `type` string and payload
    pub fn from_parts(kind: &str, payload: Value) -> Result<Self> {
        let kind: ActionKind = kind.parse()?;
        let tagged = serde_json::json!({ "type": kind.as_str(), "payload": payload });
        Ok(serde_json::from_value(tagged)?)
    }

    /// Reject actions the remote service would refuse on replay
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::CreateSnippet(snippet) => snippet.validate(),
            Self::UpdateSnippet { id, updates } => {
                require_id(id.as_str())?;
                if updates.is_empty() {
                    return Err(Error::InvalidInput(
                        "Snippet update must change at least one field".into(),
                    ));
                }
                Ok(())
            }
            Self::DeleteSnippet { id } => require_id(id.as_str()),
            Self::CreateComment(comment) => comment.validate(),
            Self::RateSnippet(rating) => {
                Rating::new(rating.snippet_id.clone(), rating.user_id.clone(), rating.rating)
                    .map(|_| ())
            }
        }
    }

    /// Split the action into its `type` and payload
    pub fn to_parts(&self) -> Result<(ActionKind, Value)> {
        let mut tagged = serde_json::to_value(self)?;
        let payload = tagged
            .get_mut("payload")
            .map_or(Value::Null, Value::take);
        Ok((self.kind(), payload))
    }
}

fn require_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::InvalidInput("Snippet id cannot be empty".into()));
    }
    Ok(())
}

/// A stored entry whose `type` or payload could not be understood.
///
/// Kept verbatim so rewriting the queue never loses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedAction {
    pub kind: String,
    pub payload: Value,
    pub reason: String,
}

/// What a queue entry will replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionBody {
    Ready(OfflineAction),
    Malformed(MalformedAction),
}

/// One entry of the offline queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedAction {
    pub id: ActionId,
    /// User that performed the write
    pub owner_id: String,
    /// Enqueue timestamp (Unix ms)
    pub created_at: i64,
    pub body: ActionBody,
}

impl QueuedAction {
    pub(crate) fn new(owner_id: String, action: OfflineAction) -> Self {
        Self {
            id: ActionId::new(),
            owner_id,
            created_at: crate::util::unix_millis_now(),
            body: ActionBody::Ready(action),
        }
    }

    /// The replayable action, unless the entry is malformed
    pub const fn action(&self) -> Option<&OfflineAction> {
        match &self.body {
            ActionBody::Ready(action) => Some(action),
            ActionBody::Malformed(_) => None,
        }
    }

    /// The `type` label of the entry, known or not
    pub fn kind_label(&self) -> &str {
        match &self.body {
            ActionBody::Ready(action) => action.kind().as_str(),
            ActionBody::Malformed(malformed) => &malformed.kind,
        }
    }
}
