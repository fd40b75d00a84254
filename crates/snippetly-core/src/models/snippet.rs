//! Snippet model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Identifier of a snippet record.
///
/// Ids minted locally are UUID v7 (time-sortable); ids coming back from the
/// remote service are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnippetId(String);

impl SnippetId {
    /// Create a new unique snippet ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SnippetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SnippetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SnippetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A saved code snippet as stored by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: SnippetId,
    /// Owner of the snippet
    pub user_id: String,
    pub title: String,
    pub code: String,
    pub language: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a snippet that has not been inserted yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSnippet {
    pub user_id: String,
    pub title: String,
    pub code: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
}

impl NewSnippet {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        code: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            title: title.into(),
            code: code.into(),
            language: language.into(),
            description: None,
            tags: Vec::new(),
            is_public: false,
        }
    }

    /// Reject snippets the remote schema would refuse anyway.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidInput("Snippet title cannot be empty".into()));
        }
        if self.code.trim().is_empty() {
            return Err(Error::InvalidInput("Snippet code cannot be empty".into()));
        }
        if self.language.trim().is_empty() {
            return Err(Error::InvalidInput("Snippet language cannot be empty".into()));
        }
        Ok(())
    }
}

/// Partial update of a snippet; `None` fields are left untouched remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

impl SnippetUpdate {
    /// True when the update would not change any field
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.code.is_none()
            && self.language.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.is_public.is_none()
    }
}

/// A user's rating of a snippet, 1 to 5 stars
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub snippet_id: SnippetId,
    pub user_id: String,
    pub rating: u8,
}

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(snippet_id: SnippetId, user_id: impl Into<String>, rating: u8) -> Result<Self> {
        if !(Self::MIN..=Self::MAX).contains(&rating) {
            return Err(Error::InvalidInput(format!(
                "Rating must be between {} and {}, got {rating}",
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self {
            snippet_id,
            user_id: user_id.into(),
            rating,
        })
    }
}
