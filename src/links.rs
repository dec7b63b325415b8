//! Site-URL resolution for references found in post content.
//!
//! Posts reference images and other posts with paths relative to their own
//! source file. The published site serves everything from the output root,
//! so each relative reference is rewritten to a root-relative URL:
//!
//! ```text
//! source: blog/2026/post-one.adoc
//!   images/cover.png        → /blog/2026/images/cover.png
//!   ../2025/old.adoc#intro  → /blog/2025/old/#intro      (links only)
//!   https://example.com     → https://example.com        (untouched)
//!   ../../../etc/passwd     → ../../../etc/passwd        (fallback)
//! ```
//!
//! Resolution never fails. References that would walk above the content root
//! come back as [`Resolved::Fallback`] carrying the raw value, so callers can
//! tell a rewrite from a refusal without an error path.

use crate::types::{strip_markup_extension, to_unix};
use std::path::Path;

const EXTERNAL_PREFIXES: &[&str] = &[
    "http://", "https://", "//", "mailto:", "tel:", "data:", "/", "#",
];

/// Outcome of a best-effort transformation.
///
/// `Ok` carries the transformed value; `Fallback` carries the original value
/// that is used unchanged because the transformation was not possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved<T> {
    Ok(T),
    Fallback(T),
}

impl<T> Resolved<T> {
    /// The value to use, whichever path produced it.
    pub fn into_value(self) -> T {
        match self {
            Resolved::Ok(v) | Resolved::Fallback(v) => v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolved::Fallback(_))
    }
}

/// Whether a reference is already external or root-relative.
pub fn is_external_or_absolute(value: &str) -> bool {
    EXTERNAL_PREFIXES.iter().any(|p| value.starts_with(p))
}

/// Rewrite a reference found in a post to a root-relative site URL.
///
/// `source_dir` is the post's directory relative to the content root (empty
/// for top-level posts). With `convert_links`, references to markup sources
/// become the trailing-slash directory URL the post is published under.
pub fn resolve_site_url(raw: &str, source_dir: &Path, convert_links: bool) -> Resolved<String> {
    if raw.trim().is_empty() {
        return Resolved::Ok(raw.to_string());
    }

    let value = raw.trim();
    if is_external_or_absolute(value) {
        return Resolved::Ok(value.to_string());
    }

    let (rest, fragment) = match value.find('#') {
        Some(i) => value.split_at(i),
        None => (value, ""),
    };
    let (path, query) = match rest.find('?') {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };

    if path.trim().is_empty() {
        return Resolved::Fallback(raw.to_string());
    }

    let Some(normalized) = normalize_under_root(&to_unix(source_dir), path) else {
        return Resolved::Fallback(raw.to_string());
    };

    let normalized = if convert_links && normalized.ends_with(".adoc") {
        format!("{}/", strip_markup_extension(&normalized))
    } else {
        normalized
    };

    Resolved::Ok(format!("/{normalized}{query}{fragment}"))
}

/// Join `path` onto `base` and collapse `.`/`..` segments.
///
/// Returns `None` when a `..` would climb above the root.
fn normalize_under_root(base: &str, path: &str) -> Option<String> {
    let mut stack: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(path.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop()?;
            }
            other => stack.push(other),
        }
    }
    Some(stack.join("/"))
}
