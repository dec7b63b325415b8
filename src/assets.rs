//! Static assets: the files bundled into the binary and verbatim copies of
//! non-markup content files.
//!
//! Bundled assets are embedded at compile time with `include_str!` and
//! written under `assets/` on every full build:
//!
//! | File | Purpose |
//! |------|---------|
//! | `style-light.css` / `style-dark.css` | Theme stylesheets, swapped by `theme.js` |
//! | `code.css` | Listing blocks, language badges, line numbers |
//! | `theme.js` | Light/dark toggle persisted in `localStorage`, line numbering |
//! | `search.js` | Client-side filter over `search-index.json` |

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const STYLE_LIGHT_URL: &str = "/assets/style-light.css";
pub const STYLE_DARK_URL: &str = "/assets/style-dark.css";
pub const CODE_CSS_URL: &str = "/assets/code.css";
pub const THEME_JS_URL: &str = "/assets/theme.js";
pub const SEARCH_JS_URL: &str = "/assets/search.js";

/// A file shipped inside the binary.
#[derive(Debug, Clone, Copy)]
pub struct BundledAsset {
    /// Output path relative to the output root.
    pub path: &'static str,
    pub content: &'static str,
}

pub const BUNDLED_ASSETS: &[BundledAsset] = &[
    BundledAsset {
        path: "assets/style-light.css",
        content: include_str!("../static/style-light.css"),
    },
    BundledAsset {
        path: "assets/style-dark.css",
        content: include_str!("../static/style-dark.css"),
    },
    BundledAsset {
        path: "assets/code.css",
        content: include_str!("../static/code.css"),
    },
    BundledAsset {
        path: "assets/theme.js",
        content: include_str!("../static/theme.js"),
    },
    BundledAsset {
        path: "assets/search.js",
        content: include_str!("../static/search.js"),
    },
];

/// Write every bundled asset under `output_root`. Any failure is returned.
pub fn write_bundled_assets(output_root: &Path) -> io::Result<()> {
    for asset in BUNDLED_ASSETS {
        write_file(&output_root.join(asset.path), asset.content)?;
    }
    Ok(())
}

/// Write `content` to `path`, creating parent directories.
pub fn write_file(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

/// Copy `source` to `target`, creating parent directories and replacing any
/// existing file. The modification time is carried over so thumbnail
/// freshness checks compare against the content file, not the copy time.
pub fn copy_file(source: &Path, target: &Path) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, target)?;
    if let Ok(modified) = fs::metadata(source).and_then(|m| m.modified()) {
        let file = fs::File::options().write(true).open(target)?;
        file.set_modified(modified)?;
    }
    Ok(())
}

/// Remove a directory tree if it exists.
pub fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Remove a file if it exists. Returns whether anything was removed.
pub fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// All regular files under `root`, relative to it, in a stable order.
///
/// Anything under `exclude` (typically an output directory nested inside the
/// content root) is skipped.
pub fn collect_source_files(root: &Path, exclude: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.path() != exclude);
    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            files.push(relative.to_path_buf());
        }
    }
    Ok(files)
}
