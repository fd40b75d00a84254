//! Remote data service used to replay queued writes.

mod supabase;

use std::fmt;
use std::future::Future;

use serde_json::Value;
use thiserror::Error;

pub use supabase::{normalize_rest_url, SupabaseDataClient};

/// Record collections the offline queue writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Snippets,
    Comments,
    Ratings,
}

impl Collection {
    /// Backend table name
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Snippets => "snippets",
            Self::Comments => "comments",
            Self::Ratings => "ratings",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Remote HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote API error: {0}")]
    Api(String),
    #[error("No {collection} record with id {id}")]
    NotFound { collection: Collection, id: String },
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Write operations on named record collections.
///
/// Each call either succeeds or returns a structured failure; callers treat
/// every failure as retryable on a later sync.
pub trait RemoteService: Send + Sync {
    /// Insert a new record
    fn insert(
        &self,
        collection: Collection,
        record: Value,
    ) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Apply a partial update to the record with `id`
    fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Value,
    ) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Delete the record with `id`; a record that is already gone is not an error
    fn delete(&self, collection: Collection, id: &str)
        -> impl Future<Output = RemoteResult<()>> + Send;

    /// Insert or merge `record`, matching existing rows on `conflict_columns`
    fn upsert(
        &self,
        collection: Collection,
        record: Value,
        conflict_columns: &[&str],
    ) -> impl Future<Output = RemoteResult<()>> + Send;
}
