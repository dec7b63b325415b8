//! CLI output formatting for builds, the watcher, and the dev server.
//!
//! # Progress Lines
//!
//! Every file the build touches is reported on one line, tagged with what
//! happened to it. Paths are relative to the content or output root and
//! always use forward slashes.
//!
//! ```text
//! [copy] blog/2026/images/cover.png
//! [render] blog/2026/post-one.adoc -> blog/2026/post-one/index.html
//! [remove] blog/2026/old-post.adoc
//! [delete] blog/2026/images/unused.png
//! [config] reloaded quire.toml
//! [done] 2 posts, 2 tags, 3 assets in 0.04s
//! [serve] http://localhost:8080/
//! [watch] /home/me/blog/content
//! ```
//!
//! # Architecture
//!
//! Each line has a `format_*` function (returns `String`) for testability and
//! the `print_*` wrappers write to stdout. Format functions are pure: no I/O,
//! no side effects. Diagnostics that are not progress (warnings, recovered
//! failures) go through `tracing` instead.

use crate::types::to_unix;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One reportable step of a full or incremental build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    /// A non-markup file was copied to the output.
    Copied(PathBuf),
    /// A post page was written.
    Rendered { source: PathBuf, output: PathBuf },
    /// A post was dropped and its output directory deleted.
    Removed(PathBuf),
    /// A copied asset was deleted from the output.
    Deleted(PathBuf),
    /// The site configuration was reloaded.
    ConfigReloaded,
}

/// Totals reported when a full build finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    pub posts: usize,
    pub tags: usize,
    pub assets: usize,
    pub elapsed: Duration,
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

// ============================================================================
// Format functions
// ============================================================================

/// Format a single build event as a progress line.
pub fn format_build_event(event: &BuildEvent) -> String {
    match event {
        BuildEvent::Copied(path) => format!("[copy] {}", to_unix(path)),
        BuildEvent::Rendered { source, output } => {
            format!("[render] {} -> {}", to_unix(source), to_unix(output))
        }
        BuildEvent::Removed(path) => format!("[remove] {}", to_unix(path)),
        BuildEvent::Deleted(path) => format!("[delete] {}", to_unix(path)),
        BuildEvent::ConfigReloaded => {
            format!("[config] reloaded {}", crate::config::CONFIG_FILE_NAME)
        }
    }
}

/// Format the closing line of a full build.
pub fn format_build_summary(summary: &BuildSummary) -> String {
    format!(
        "[done] {}, {}, {} in {:.2}s",
        plural(summary.posts, "post"),
        plural(summary.tags, "tag"),
        plural(summary.assets, "asset"),
        summary.elapsed.as_secs_f64()
    )
}

/// Format the dev server address.
pub fn format_serve_url(port: u16) -> String {
    format!("[serve] http://localhost:{port}/")
}

/// Format the watched directory.
pub fn format_watch_root(root: &Path) -> String {
    format!("[watch] {}", root.display())
}

// ============================================================================
// Print wrappers
// ============================================================================

/// Print a build event to stdout.
pub fn print_build_event(event: &BuildEvent) {
    println!("{}", format_build_event(event));
}

/// Print the build summary to stdout.
pub fn print_build_summary(summary: &BuildSummary) {
    println!("{}", format_build_summary(summary));
}

/// Print the dev server address to stdout.
pub fn print_serve_url(port: u16) {
    println!("{}", format_serve_url(port));
}

/// Print the watched directory to stdout.
pub fn print_watch_root(root: &Path) {
    println!("{}", format_watch_root(root));
}

// ============================================================================
// Tests
// ============================================================================
