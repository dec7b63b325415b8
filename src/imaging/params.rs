//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides what thumbnails to create) and the [`backend`](super::backend)
//! (which does the actual pixel work). This separation allows swapping backends
//! (e.g. for testing with a mock) without changing operation logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`OutputFormat`]: Thumbnail encoding, chosen from the source extension.
//! - [`ThumbnailBounds`]: Bounding box a thumbnail must fit in (default 360×240).
//! - [`ThumbnailParams`]: Everything needed to write a thumbnail: source, output, size, resize steps.

use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Encoding of a generated thumbnail.
///
/// Only the raster formats in this enum are eligible for thumbnailing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    /// Format for a source extension (case-insensitive), if eligible.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Extension written for this format; JPEG is normalized to `jpg`.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    /// Whether the encoded pixels keep an alpha channel.
    pub fn has_alpha(self) -> bool {
        matches!(self, Self::Png)
    }
}

/// Box a thumbnail is scaled into. Images are never upscaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailBounds {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for ThumbnailBounds {
    fn default() -> Self {
        Self {
            max_width: 360,
            max_height: 240,
        }
    }
}

/// Parameters for a thumbnail operation (progressive downscale + encode).
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Final dimensions.
    pub width: u32,
    pub height: u32,
    /// Intermediate and final sizes, in order. The last entry is `(width, height)`.
    pub steps: Vec<(u32, u32)>,
    pub format: OutputFormat,
    pub quality: Quality,
}
