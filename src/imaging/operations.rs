//! High-level image operations.
//!
//! These functions combine calculations with backend execution: they plan a
//! thumbnail from the source dimensions and hand the plan to the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{fit_within, halving_steps};
use super::params::{OutputFormat, Quality, ThumbnailBounds, ThumbnailParams};
use crate::links::Resolved;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Directory, relative to the output root, that mirrors cover locations.
pub const THUMBNAILS_DIR: &str = "assets/thumbnails";

/// Write a bounded copy of `source` to `target`.
///
/// Returns `Ok(false)` when the source cannot be decoded or reports a zero
/// dimension. I/O and encoding failures are errors.
pub fn create_thumbnail(
    backend: &impl ImageBackend,
    source: &Path,
    target: &Path,
    format: OutputFormat,
    bounds: ThumbnailBounds,
) -> Result<bool> {
    let dims = match backend.identify(source) {
        Ok(d) => d,
        Err(BackendError::Decode(_)) => return Ok(false),
        Err(e) => return Err(e),
    };
    if dims.width == 0 || dims.height == 0 {
        return Ok(false);
    }

    let original = (dims.width, dims.height);
    let (width, height) = fit_within(original, bounds);
    let steps = halving_steps(original, (width, height));

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let params = ThumbnailParams {
        source: source.to_path_buf(),
        output: target.to_path_buf(),
        width,
        height,
        steps,
        format,
        quality: Quality::default(),
    };
    match backend.thumbnail(&params) {
        Ok(()) => Ok(true),
        Err(BackendError::Decode(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Thumbnail location for an image at `relative` (relative to the output
/// root), or `None` when the extension is not eligible.
///
/// `blog/2026/images/cover.jpeg` maps to
/// `assets/thumbnails/blog/2026/images/cover-thumb.jpg`.
pub fn thumbnail_path_for(relative: &Path) -> Option<(PathBuf, OutputFormat)> {
    let format = OutputFormat::from_extension(relative.extension()?.to_str()?)?;
    let stem = relative.file_stem()?.to_str()?;
    let file_name = format!("{stem}-thumb.{}", format.extension());

    let mut path = PathBuf::from(THUMBNAILS_DIR);
    if let Some(parent) = relative.parent() {
        path.push(parent);
    }
    path.push(file_name);
    Some((path, format))
}

/// Relative path for a root-relative URL, or `None` if it would leave the root.
fn root_relative_path(url: &str) -> Option<PathBuf> {
    let relative = Path::new(url.strip_prefix('/')?);
    let mut clean = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!clean.as_os_str().is_empty()).then_some(clean)
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// A thumbnail carries its cover's mtime, so any change to the cover,
/// including a replacement by an older file, shows up as a mismatch.
fn is_fresh(target: &Path, source: &Path) -> bool {
    match (modified(target), modified(source)) {
        (Some(t), Some(s)) => t == s,
        _ => false,
    }
}

fn stamp_source_mtime(target: &Path, source: &Path) -> std::io::Result<()> {
    let mtime = fs::metadata(source)?.modified()?;
    fs::File::options().write(true).open(target)?.set_modified(mtime)
}

/// Resolve the image shown for a post on the index page.
///
/// Only root-relative covers pointing at an existing file with an eligible
/// extension inside `output_root` get a thumbnail. Everything else, and any
/// failure along the way, falls back to the cover URL unchanged.
pub fn resolve_cover_thumbnail(
    backend: &impl ImageBackend,
    output_root: &Path,
    cover: &str,
) -> Resolved<String> {
    let cover = cover.trim();
    let fallback = || Resolved::Fallback(cover.to_string());

    if !cover.starts_with('/') || cover.starts_with("//") {
        return fallback();
    }
    let Some(relative) = root_relative_path(cover) else {
        return fallback();
    };
    let source = output_root.join(&relative);
    if !source.is_file() {
        return fallback();
    }
    let Some((thumb_relative, format)) = thumbnail_path_for(&relative) else {
        return fallback();
    };

    let url = format!("/{}", crate::types::to_unix(&thumb_relative));
    let target = output_root.join(&thumb_relative);
    if is_fresh(&target, &source) {
        return Resolved::Ok(url);
    }

    match create_thumbnail(backend, &source, &target, format, ThumbnailBounds::default()) {
        Ok(true) => {
            if let Err(e) = stamp_source_mtime(&target, &source) {
                tracing::debug!(cover, error = %e, "could not stamp thumbnail mtime");
            }
            Resolved::Ok(url)
        }
        Ok(false) => {
            tracing::debug!(cover, "cover is not a decodable image, using original");
            fallback()
        }
        Err(e) => {
            tracing::warn!(cover, error = %e, "failed creating thumbnail");
            fallback()
        }
    }
}
