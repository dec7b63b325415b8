//! Client-side search index.
//!
//! `assets/search-index.json` is a top-level array with one object per post,
//! in listing order. Every field is a string:
//!
//! ```text
//! [
//!   {"title":"..","date":"2026-01-13","tags":"AI, Java","url":"/blog/2026/post-two/","body":"..","teaser":".."},
//!   ...
//! ]
//! ```
//!
//! The layout is fixed, one record per line, so the file is assembled by
//! hand with [`escape_json`] rather than through a serializer.

use crate::types::Post;

/// Output path relative to the output root.
pub const SEARCH_INDEX_PATH: &str = "assets/search-index.json";

/// Escape a string for use inside a JSON string literal.
///
/// Quote, backslash and the common control characters use their short
/// escapes; other characters below U+0020 become `\u00XX`.
pub fn escape_json(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 16);
    for ch in value.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\u{08}' => escaped.push_str("\\b"),
            '\u{0C}' => escaped.push_str("\\f"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if (c as u32) < 0x20 => escaped.push_str(&format!("\\u{:04x}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

fn json_field(key: &str, value: &str) -> String {
    format!("\"{}\":\"{}\"", escape_json(key), escape_json(value))
}

fn record(post: &Post) -> String {
    let fields = [
        json_field("title", &post.title),
        json_field("date", &post.date.to_string()),
        json_field("tags", &post.tags_as_text()),
        json_field("url", &post.url()),
        json_field("body", &post.plain_text),
        json_field("teaser", &post.teaser),
    ];
    format!("  {{{}}}", fields.join(","))
}

/// Render the index for `posts`, which must already be in listing order.
pub fn render_search_index(posts: &[&Post]) -> String {
    let records: Vec<String> = posts.iter().map(|p| record(p)).collect();
    format!("[\n{}\n]\n", records.join(",\n"))
}
