//! File events and their classification.
//!
//! The watcher reports raw `(path, kind)` pairs. Before the site sees them,
//! each pair is turned into a [`FileEvent`]: the path is made relative to the
//! content root and the file is classified as markup, asset, or the site
//! config. Paths that cannot matter (outside the root, inside the output
//! directory, directories, editor temp files) are dropped here.
//!
//! | Kind × Class | Site reaction |
//! |---|---|
//! | Created/Modified × Markup | Re-parse and render that post, then aggregates |
//! | Created/Modified × Asset | Copy the file |
//! | Created/Modified × Config | Copy, reload config, render every post and aggregates |
//! | Deleted × Markup | Drop the post and its output directory, then aggregates |
//! | Deleted × Asset/Config | Delete the copied file |

use crate::config::is_config_file;
use crate::types::is_markup;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Created,
    Modified,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileClass {
    Markup,
    Asset,
    Config,
}

impl FileClass {
    /// Class of a path relative to the content root.
    pub fn of(relative: &Path) -> Self {
        if is_config_file(relative) {
            Self::Config
        } else if is_markup(relative) {
            Self::Markup
        } else {
            Self::Asset
        }
    }
}

/// A change to one file below the content root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileEvent {
    pub kind: EventKind,
    pub class: FileClass,
    /// Relative to the content root.
    pub path: PathBuf,
}

impl FileEvent {
    pub fn new(kind: EventKind, relative: impl Into<PathBuf>) -> Self {
        let path = relative.into();
        Self {
            kind,
            class: FileClass::of(&path),
            path,
        }
    }
}

/// Editor and tool artifacts that never affect the site.
///
/// Covers backup files (`name~`), vim swap files, the `4913` probe file vim
/// writes to test directory permissions, and emacs lock files (`.#name`).
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "swp" | "swx" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with(".#")
        || name == "4913"
}

/// Turn a raw watcher path into a [`FileEvent`], or `None` if it is irrelevant.
///
/// `input_root` and `output_root` must be absolute. A relative `raw_path` is
/// taken relative to `input_root`.
pub fn classify(
    input_root: &Path,
    output_root: &Path,
    raw_path: &Path,
    kind: EventKind,
) -> Option<FileEvent> {
    let absolute = if raw_path.is_absolute() {
        raw_path.to_path_buf()
    } else {
        input_root.join(raw_path)
    };

    if absolute.starts_with(output_root) && output_root.starts_with(input_root) {
        return None;
    }
    let relative = absolute.strip_prefix(input_root).ok()?;
    if relative.as_os_str().is_empty() || absolute.is_dir() || is_temp_file(relative) {
        return None;
    }
    if relative
        .components()
        .any(|c| !matches!(c, std::path::Component::Normal(_)))
    {
        return None;
    }
    Some(FileEvent::new(kind, relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // =========================================================================
    // FileClass / FileEvent
    // =========================================================================

    #[test]
    fn classes() {
        assert_eq!(FileClass::of(Path::new("blog/a.adoc")), FileClass::Markup);
        assert_eq!(FileClass::of(Path::new("blog/a.png")), FileClass::Asset);
        assert_eq!(FileClass::of(Path::new("quire.toml")), FileClass::Config);
        // Only the root config counts
        assert_eq!(FileClass::of(Path::new("blog/quire.toml")), FileClass::Asset);
    }

    #[test]
    fn event_new_classifies() {
        let event = FileEvent::new(EventKind::Deleted, "blog/2026/post-one.adoc");
        assert_eq!(event.class, FileClass::Markup);
        assert_eq!(event.path, PathBuf::from("blog/2026/post-one.adoc"));
    }

    // =========================================================================
    // is_temp_file
    // =========================================================================

    #[test]
    fn temp_files() {
        for name in [
            "post.adoc~",
            ".post.adoc.swp",
            ".post.adoc.swx",
            "x.tmp",
            "4913",
            ".#post.adoc",
        ] {
            assert!(is_temp_file(Path::new(name)), "{name}");
        }
        for name in ["post.adoc", "cover.png", ".htaccess", "quire.toml"] {
            assert!(!is_temp_file(Path::new(name)), "{name}");
        }
    }

    // =========================================================================
    // classify
    // =========================================================================

    #[test]
    fn classify_makes_path_relative() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("content");
        let output = tmp.path().join("public");
        let event = classify(
            &input,
            &output,
            &input.join("blog/2026/post-one.adoc"),
            EventKind::Modified,
        )
        .unwrap();
        assert_eq!(event.path, PathBuf::from("blog/2026/post-one.adoc"));
        assert_eq!(event.class, FileClass::Markup);
        assert_eq!(event.kind, EventKind::Modified);
    }

    #[test]
    fn classify_accepts_relative_paths() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("content");
        let event = classify(
            &input,
            &tmp.path().join("public"),
            Path::new("quire.toml"),
            EventKind::Modified,
        )
        .unwrap();
        assert_eq!(event.class, FileClass::Config);
    }

    #[test]
    fn classify_ignores_outside_root() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("content");
        let output = tmp.path().join("public");
        assert!(classify(&input, &output, &tmp.path().join("x.adoc"), EventKind::Created).is_none());
        assert!(
            classify(&input, &output, Path::new("../x.adoc"), EventKind::Created).is_none()
        );
    }

    #[test]
    fn classify_ignores_nested_output_dir() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().to_path_buf();
        let output = tmp.path().join("public");
        assert!(
            classify(&input, &output, &output.join("index.html"), EventKind::Created).is_none()
        );
    }

    #[test]
    fn classify_ignores_directories_and_temp_files() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().to_path_buf();
        std::fs::create_dir_all(input.join("blog")).unwrap();
        let output = tmp.path().join("../public");

        assert!(classify(&input, &output, &input.join("blog"), EventKind::Created).is_none());
        assert!(
            classify(&input, &output, &input.join("blog/a.adoc~"), EventKind::Modified).is_none()
        );
        assert!(classify(&input, &output, &input, EventKind::Modified).is_none());
    }

    #[test]
    fn deleted_paths_still_classify() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().to_path_buf();
        let event = classify(
            &input,
            &tmp.path().join("out"),
            &input.join("gone/old.adoc"),
            EventKind::Deleted,
        )
        .unwrap();
        assert_eq!(event.kind, EventKind::Deleted);
        assert_eq!(event.class, FileClass::Markup);
    }
}
