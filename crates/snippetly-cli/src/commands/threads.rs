use std::fs;
use std::path::Path;

use snippetly_core::threads::visible_count;
use snippetly_core::{build_threads, Comment, CommentThread, RootOrder};

use crate::commands::common::{format_relative_time, now_millis, read_argument_or_stdin};
use crate::error::CliError;

pub fn run_threads(file: &Path, order: RootOrder, as_json: bool) -> Result<(), CliError> {
    let raw = if file.as_os_str() == "-" {
        read_argument_or_stdin("-")?.unwrap_or_default()
    } else {
        fs::read_to_string(file)?
    };

    let comments = parse_comments(&raw)?;
    let threads = build_threads(&comments, order);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&threads)?);
        return Ok(());
    }

    if threads.is_empty() {
        println!("No comments.");
        return Ok(());
    }

    for line in format_thread_lines(&threads, now_millis()) {
        println!("{line}");
    }

    let hidden = comments.len() - visible_count(&threads);
    if hidden > 0 {
        println!("({hidden} comment(s) without a displayable parent hidden)");
    }
    Ok(())
}

/// Parse a JSON array of comments; blank input is an empty list
pub fn parse_comments(raw: &str) -> Result<Vec<Comment>, CliError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(raw)?)
}

pub fn format_thread_lines(threads: &[CommentThread], now_ms: i64) -> Vec<String> {
    let mut lines = Vec::new();
    for thread in threads {
        lines.push(format_comment_line(&thread.comment, now_ms, ""));
        for reply in &thread.replies {
            lines.push(format_comment_line(reply, now_ms, "    > "));
        }
    }
    lines
}

fn format_comment_line(comment: &Comment, now_ms: i64, prefix: &str) -> String {
    format!(
        "{prefix}{} ({}): {}",
        comment.author_id,
        format_relative_time(comment.created_at.timestamp_millis(), now_ms),
        comment.content.replace('\n', " ")
    )
}
