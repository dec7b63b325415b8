//! Shared types used across parsing, rendering, and the registry.
//!
//! A [`Post`] is an immutable value: once the parser builds it, nothing
//! mutates it. Everything that derives from the source location (`url`,
//! `guid`, output path) is computed on demand from `source_path`, so the
//! three can never drift apart.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Extension of markup source files, without the dot.
pub const MARKUP_EXTENSION: &str = "adoc";

/// Status assigned when a post does not declare one.
pub const DEFAULT_STATUS: &str = "published";

/// Whether a path names a markup source file.
pub fn is_markup(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == MARKUP_EXTENSION)
}

/// Render a relative path with forward slashes regardless of platform.
pub fn to_unix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Strip the markup extension from a slash-separated path, if present.
pub fn strip_markup_extension(path: &str) -> &str {
    path.strip_suffix(".adoc").unwrap_or(path)
}

/// A tag as displayed on a post, together with its page slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    pub name: String,
    pub slug: String,
}

/// One parsed post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Path relative to the content root. Registry key.
    pub source_path: PathBuf,
    pub title: String,
    pub author: String,
    pub date: NaiveDate,
    /// Free-form, defaults to [`DEFAULT_STATUS`].
    pub status: String,
    /// Deduplicated case-insensitively, first-seen casing and order.
    pub tags: Vec<TagRef>,
    pub teaser: String,
    /// Root-relative or external URL of the cover image, if any.
    pub cover_image: Option<String>,
    /// Normalized HTML fragment (links rewritten, code blocks annotated).
    pub html_content: String,
    /// Whitespace-collapsed text of `html_content`.
    pub plain_text: String,
}

impl Post {
    /// Source path without the markup extension, slash-separated.
    fn stem_path(&self) -> String {
        strip_markup_extension(&to_unix(&self.source_path)).to_string()
    }

    /// Site URL, e.g. `/blog/2026/post-one/`.
    pub fn url(&self) -> String {
        format!("/{}/", self.stem_path())
    }

    /// Stable feed identifier, e.g. `blog/2026/post-one/`.
    pub fn guid(&self) -> String {
        format!("{}/", self.stem_path())
    }

    /// Output file relative to the output root, e.g. `blog/2026/post-one/index.html`.
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(self.stem_path()).join("index.html")
    }

    /// Tag display names joined with `", "`.
    pub fn tags_as_text(&self) -> String {
        self.tags
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
