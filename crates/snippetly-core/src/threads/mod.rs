//! Comment threading
//!
//! Turns a flat list of comments into root comments with their direct
//! replies. Threads are exactly two levels deep: [`CommentThread::replies`]
//! holds plain [`Comment`]s, which cannot carry replies of their own.
//!
//! - A reply whose parent is missing from the input is dropped, not promoted.
//! - A reply to a reply is dropped as well.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{Comment, CommentId};

/// Ordering of root comments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// A root comment and its direct replies, oldest reply first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentThread {
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

impl CommentThread {
    /// Number of comments displayed by this thread
    pub fn comment_count(&self) -> usize {
        1 + self.replies.len()
    }
}

/// Build display threads from an unordered list of comments.
///
/// Sorting is stable, so comments with equal timestamps keep their input order.
pub fn build_threads(comments: &[Comment], order: RootOrder) -> Vec<CommentThread> {
    let by_id: HashMap<&CommentId, &Comment> =
        comments.iter().map(|comment| (&comment.id, comment)).collect();

    let mut roots: Vec<&Comment> = Vec::new();
    let mut replies: HashMap<&CommentId, Vec<&Comment>> = HashMap::new();
    let mut dropped = 0usize;

    for comment in comments {
        let Some(parent_id) = &comment.parent_comment_id else {
            roots.push(comment);
            continue;
        };

        match by_id.get(parent_id) {
            Some(parent) if !parent.is_reply() => {
                replies.entry(parent_id).or_default().push(comment);
            }
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::debug!("Dropped {} comment(s) with a missing or nested parent", dropped);
    }

    match order {
        RootOrder::NewestFirst => roots.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        RootOrder::OldestFirst => roots.sort_by_key(|comment| comment.created_at),
    }

    roots
        .into_iter()
        .map(|root| {
            let mut thread_replies = replies.remove(&root.id).unwrap_or_default();
            thread_replies.sort_by_key(|reply| reply.created_at);
            CommentThread {
                comment: root.clone(),
                replies: thread_replies.into_iter().cloned().collect(),
            }
        })
        .collect()
}

/// Total number of comments the threads will display
pub fn visible_count(threads: &[CommentThread]) -> usize {
    threads.iter().map(CommentThread::comment_count).sum()
}
