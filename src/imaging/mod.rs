//! Cover image thumbnails, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Thumbnail** | progressive halving with `image::imageops::resize` (Lanczos3) |
//! | **Encode** | PNG (RGBA8) or JPEG (RGB8) via the `image` codecs |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend,
//!   including the index-page cover resolution

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{fit_within, halving_steps};
pub use operations::{create_thumbnail, resolve_cover_thumbnail, thumbnail_path_for};
pub use params::{OutputFormat, Quality, ThumbnailBounds, ThumbnailParams};
pub use rust_backend::RustBackend;
