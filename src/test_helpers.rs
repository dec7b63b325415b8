//! Shared test utilities for the quire test suite.
//!
//! Fixture writers for content trees and synthetic images, so unit tests can
//! build a small site in a `TempDir` without checked-in fixture files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_site_config(tmp.path());
//! write_post(tmp.path(), "blog/2026/post-one.adoc", "First Post", "2026-01-12", "Java, AI", "Body.");
//! ```

use std::path::Path;

// =========================================================================
// Content fixtures
// =========================================================================

/// Minimal valid `quire.toml`.
pub const SITE_CONFIG: &str = r#"[site]
title = "Quire Test Blog"
description = "Posts for tests"
base_url = "https://blog.example.com/"
language = "en"
date_format = "%d.%m.%Y"

[dev]
port = 4321
"#;

/// Write `content` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Write [`SITE_CONFIG`] as `quire.toml` at the content root.
pub fn write_site_config(root: &Path) {
    write_file(root, crate::config::CONFIG_FILE_NAME, SITE_CONFIG);
}

/// Front matter plus body for a post.
pub fn post_source(title: &str, date: &str, tags: &str, body: &str) -> String {
    format!("---\n= {title}\nTest Author\n{date}\n:tags: {tags}\n---\n{body}\n")
}

/// Write a post at `relative` below the content root.
pub fn write_post(root: &Path, relative: &str, title: &str, date: &str, tags: &str, body: &str) {
    write_file(root, relative, &post_source(title, date, tags, body));
}

// =========================================================================
// Synthetic images
// =========================================================================

/// Write a gradient JPEG of the given size.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    img.save(path).unwrap();
}

/// Write a gradient PNG with an alpha channel.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 200, 255])
    });
    img.save(path).unwrap();
}
