//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::SnippetId;
use crate::error::{Error, Result};

/// Identifier of a comment record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(String);

impl CommentId {
    /// Create a new unique comment ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CommentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CommentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A comment on a snippet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub snippet_id: SnippetId,
    #[serde(alias = "user_id")]
    pub author_id: String,
    pub content: String,
    /// `None` marks a top-level comment
    #[serde(default, alias = "parent_id")]
    pub parent_comment_id: Option<CommentId>,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Whether this comment answers another comment
    #[must_use]
    pub const fn is_reply(&self) -> bool {
        self.parent_comment_id.is_some()
    }
}

/// A comment waiting to be inserted
///
/// Serializes to the backend column names (`user_id`, `parent_id`) and also
/// reads the field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub snippet_id: SnippetId,
    #[serde(rename = "user_id", alias = "author_id")]
    pub author_id: String,
    pub content: String,
    #[serde(
        default,
        rename = "parent_id",
        alias = "parent_comment_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_comment_id: Option<CommentId>,
}

impl NewComment {
    #[must_use]
    pub fn new(
        snippet_id: SnippetId,
        author_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            snippet_id,
            author_id: author_id.into(),
            content: content.into(),
            parent_comment_id: None,
        }
    }

    /// Turn this comment into a reply to `parent`
    #[must_use]
    pub fn replying_to(mut self, parent: CommentId) -> Self {
        self.parent_comment_id = Some(parent);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(Error::InvalidInput("Comment cannot be empty".into()));
        }
        Ok(())
    }
}
