//! Post parsing: front matter, markup rendering, and normalization.
//!
//! Turns one source file into an immutable [`Post`]. A source file looks like:
//!
//! ```text
//! ---
//! = First Post                 title (required, `= ` marker)
//! Jane Doe                     author
//! 2026-01-12                   date (ISO calendar date)
//! :tags: Java, AI              optional attributes
//! :teaser: Manual override
//! :cover-image: images/cover.png
//! :status: draft
//! ---
//! Body text in AsciiDoc...
//! ```
//!
//! ## Pipeline
//!
//! 1. Split front matter from body at the first two `---` lines
//! 2. Parse title, author, date, then `:key: value` attributes
//! 3. Scan the raw body for source blocks requesting line numbers
//! 4. Render the body through the [`MarkupRenderer`]
//! 5. Normalize the fragment (site URLs, code block annotation)
//! 6. Extract plain text
//! 7. Resolve teaser, cover image, and tags
//!
//! Step 3 has to run on the raw text: once rendered, the attribute line that
//! asked for line numbers is gone.

use crate::html::{self, MarkupError};
use crate::links::resolve_site_url;
use crate::markup::{MarkupRenderer, RenderError};
use crate::slug::slugify;
use crate::types::{DEFAULT_STATUS, Post, TagRef};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Characters kept when a teaser is derived from the post text.
pub const TEASER_LENGTH: usize = 200;

const DELIMITER: &str = "---";
const TITLE_MARKER: &str = "= ";

static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([^:]+):\s*(.*)$").expect("static pattern must compile"));

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed post {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
    #[error("Failed to render {}: {source}", path.display())]
    Render { path: PathBuf, source: RenderError },
    #[error("Failed to process HTML of {}: {source}", path.display())]
    Markup { path: PathBuf, source: MarkupError },
}

fn malformed(path: &Path, reason: impl Into<String>) -> ParseError {
    ParseError::Malformed {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Header fields parsed from the front matter block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter {
    pub title: String,
    pub author: String,
    pub date: NaiveDate,
    pub attributes: HashMap<String, String>,
}

impl FrontMatter {
    /// Attribute value, trimmed, if present and non-blank.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Split a source file into its front matter and body.
///
/// `path` is only used in error messages.
pub fn split_front_matter(text: &str, path: &Path) -> Result<(FrontMatter, String), ParseError> {
    let lines: Vec<&str> = text.lines().collect();

    if lines.first().map(|l| l.trim()) != Some(DELIMITER) {
        return Err(malformed(path, "missing front matter delimiter at top"));
    }
    let closing = lines
        .iter()
        .skip(1)
        .position(|l| l.trim() == DELIMITER)
        .map(|i| i + 1)
        .ok_or_else(|| malformed(path, "missing closing front matter delimiter"))?;

    let header = &lines[1..closing];
    if header.len() < 3 {
        return Err(malformed(path, "front matter must contain title, author and date"));
    }

    let title = header[0]
        .trim()
        .strip_prefix(TITLE_MARKER)
        .ok_or_else(|| malformed(path, "title line must start with '= '"))?
        .trim()
        .to_string();
    let author = header[1].trim().to_string();
    let raw_date = header[2].trim();
    let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
        .map_err(|e| malformed(path, format!("invalid date '{raw_date}': {e}")))?;

    let attributes = header[3..]
        .iter()
        .filter_map(|line| ATTRIBUTE.captures(line.trim()))
        .map(|caps| (caps[1].trim().to_string(), caps[2].trim().to_string()))
        .collect();

    let body = lines[closing + 1..].join("\n");
    Ok((
        FrontMatter {
            title,
            author,
            date,
            attributes,
        },
        body,
    ))
}

// ============================================================================
// Source block line numbers
// ============================================================================

fn is_block_attribute_line(line: &str) -> bool {
    line.len() >= 2 && line.starts_with('[') && line.ends_with(']')
}

fn is_source_attribute_list(list: &str) -> bool {
    list.split(',').any(|token| {
        let token = token.trim().to_lowercase();
        token == "source" || token.starts_with("source%")
    })
}

fn requests_line_numbers(list: &str) -> bool {
    list.split(',').any(|token| {
        let token = token.trim().trim_matches('"').to_lowercase();
        token == "linenums"
            || token.starts_with("linenums=")
            || token.contains("%linenums")
            || ((token.starts_with("opts=") || token.starts_with("options="))
                && token.contains("linenums"))
    })
}

fn is_listing_delimiter(line: &str) -> bool {
    line.len() >= 4 && (line.chars().all(|c| c == '-') || line.chars().all(|c| c == '.'))
}

/// One flag per source block, in document order: whether it asks for line numbers.
///
/// A source block is a `[source...]` attribute line followed (after blank,
/// title, or comment lines) by a `----` or `....` delimiter.
pub fn detect_line_numbers(body: &str) -> Vec<bool> {
    let lines: Vec<&str> = body.lines().collect();
    let mut flags = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if !is_block_attribute_line(trimmed) {
            continue;
        }
        let list = &trimmed[1..trimmed.len() - 1];
        if !is_source_attribute_list(list) {
            continue;
        }

        let next = lines[i + 1..].iter().map(|l| l.trim()).find(|candidate| {
            !(candidate.is_empty()
                || (candidate.starts_with('.') && !is_listing_delimiter(candidate))
                || candidate.starts_with("//"))
        });
        if next.is_some_and(is_listing_delimiter) {
            flags.push(requests_line_numbers(list));
        }
    }
    flags
}

// ============================================================================
// Derived fields
// ============================================================================

/// First `max` characters of `text`, trimmed. Not word-aware.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].trim().to_string(),
        None => text.to_string(),
    }
}

fn resolve_teaser(explicit: Option<&str>, plain_text: &str) -> String {
    match explicit {
        Some(teaser) => teaser.to_string(),
        None => truncate_chars(plain_text, TEASER_LENGTH),
    }
}

fn resolve_cover(
    explicit: Option<&str>,
    html_content: &str,
    source_dir: &Path,
) -> Result<Option<String>, MarkupError> {
    if let Some(cover) = explicit {
        let resolved = resolve_site_url(cover, source_dir, false);
        if resolved.is_fallback() {
            tracing::debug!(cover, "cover image left unresolved");
        }
        return Ok(Some(resolved.into_value()));
    }
    html::first_image_src(html_content)
}

/// Split a comma-separated tag list, dropping blanks and duplicates.
///
/// Duplicates are detected case-insensitively and by slug; the first
/// occurrence keeps its casing and position.
pub fn parse_tags(raw: Option<&str>) -> Vec<TagRef> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    let mut seen_names = HashSet::new();
    let mut seen_slugs = HashSet::new();
    let mut tags = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let slug = slugify(name);
        if seen_names.insert(name.to_lowercase()) && seen_slugs.insert(slug.clone()) {
            tags.push(TagRef {
                name: name.to_string(),
                slug,
            });
        }
    }
    tags
}

// ============================================================================
// Entry points
// ============================================================================

/// Parse already-loaded source text.
///
/// `relative_path` is the source path relative to the content root;
/// `base_dir` is the on-disk directory used for renderer includes.
pub fn parse_source(
    text: &str,
    relative_path: &Path,
    base_dir: &Path,
    renderer: &dyn MarkupRenderer,
) -> Result<Post, ParseError> {
    let (front, body) = split_front_matter(text, relative_path)?;
    let source_dir = relative_path.parent().unwrap_or(Path::new(""));
    let markup_error = |source| ParseError::Markup {
        path: relative_path.to_path_buf(),
        source,
    };

    let line_numbers = detect_line_numbers(&body);
    let rendered = renderer
        .render(&body, base_dir)
        .map_err(|source| ParseError::Render {
            path: relative_path.to_path_buf(),
            source,
        })?;
    let html_content =
        html::normalize_fragment(&rendered, source_dir, &line_numbers).map_err(markup_error)?;
    let plain_text = html::extract_text(&html_content).map_err(markup_error)?;

    let teaser = resolve_teaser(front.attribute("teaser"), &plain_text);
    let cover_image = resolve_cover(front.attribute("cover-image"), &html_content, source_dir)
        .map_err(markup_error)?;
    let status = front.attribute("status").unwrap_or(DEFAULT_STATUS).to_string();
    let tags = parse_tags(front.attribute("tags"));

    Ok(Post {
        source_path: relative_path.to_path_buf(),
        title: front.title,
        author: front.author,
        date: front.date,
        status,
        tags,
        teaser,
        cover_image,
        html_content,
        plain_text,
    })
}

/// Read and parse one source file below `content_root`.
pub fn parse_post(
    source_file: &Path,
    content_root: &Path,
    renderer: &dyn MarkupRenderer,
) -> Result<Post, ParseError> {
    let relative = source_file
        .strip_prefix(content_root)
        .unwrap_or(source_file)
        .to_path_buf();
    let text = fs::read_to_string(source_file).map_err(|source| ParseError::Read {
        path: relative.clone(),
        source,
    })?;
    let base_dir = source_file.parent().unwrap_or(content_root);
    parse_source(&text, &relative, base_dir, renderer)
}
