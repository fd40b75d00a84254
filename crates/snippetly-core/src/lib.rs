//! snippetly-core - Core library for Snippetly
//!
//! This crate contains the shared models, the offline mutation queue and its
//! sync driver, the comment thread builder, and the small caches used by the
//! Snippetly clients.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod queue;
pub mod remote;
pub mod search;
pub mod state;
pub mod store;
pub mod sync;
pub mod threads;
pub mod util;

pub use cache::TtlCache;
pub use config::SnippetlyConfig;
pub use error::{Error, Result};
pub use models::{Comment, CommentId, Snippet, SnippetId};
pub use queue::{ActionId, OfflineAction, OfflineQueue, QueuedAction};
pub use search::SearchCache;
pub use state::SyncState;
pub use sync::{SyncDriver, SyncOutcome, SyncReport};
pub use threads::{build_threads, CommentThread, RootOrder};
