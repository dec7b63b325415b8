//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG) | `image` crate (pure Rust decoders) |
//! | Resize | `image::imageops::resize` with `Lanczos3`, once per halving step |
//! | Encode → PNG | `image::codecs::png::PngEncoder` on RGBA8 pixels |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` on RGB8 pixels |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{OutputFormat, ThumbnailParams};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::BufWriter;
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))
}

/// Shrink through every planned step, then fix the pixel layout for `format`.
fn downscale(img: DynamicImage, steps: &[(u32, u32)], format: OutputFormat) -> DynamicImage {
    let mut current = img;
    for &(w, h) in steps {
        if (current.width(), current.height()) != (w, h) {
            current = current.resize_exact(w, h, FilterType::Lanczos3);
        }
    }

    if format.has_alpha() {
        DynamicImage::ImageRgba8(current.into_rgba8())
    } else {
        DynamicImage::ImageRgb8(current.into_rgb8())
    }
}

/// Encode to `path` in `format`.
fn save_image(
    img: &DynamicImage,
    path: &Path,
    format: OutputFormat,
    quality: u32,
) -> Result<(), BackendError> {
    let file = std::fs::File::create(path).map_err(BackendError::Io)?;
    let writer = BufWriter::new(file);
    let result = match format {
        OutputFormat::Png => img.write_with_encoder(image::codecs::png::PngEncoder::new(writer)),
        OutputFormat::Jpeg => img.write_with_encoder(
            image::codecs::jpeg::JpegEncoder::new_with_quality(writer, quality as u8),
        ),
    };
    result.map_err(|e| {
        BackendError::ProcessingFailed(format!(
            "{} encode failed: {}",
            format.extension(),
            e
        ))
    })
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path)
            .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))?;
        Ok(Dimensions { width, height })
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let thumb = downscale(img, &params.steps, params.format);
        save_image(&thumb, &params.output, params.format, params.quality.value())
    }
}
