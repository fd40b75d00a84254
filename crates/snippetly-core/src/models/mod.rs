//! Data models for Snippetly

mod comment;
mod snippet;

pub use comment::{Comment, CommentId, NewComment};
pub use snippet::{NewSnippet, Rating, Snippet, SnippetId, SnippetUpdate};
