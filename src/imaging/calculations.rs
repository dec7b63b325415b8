//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::ThumbnailBounds;

/// Scale `original` to fit inside `bounds`, preserving aspect ratio.
///
/// The scale factor is `min(1, max_w / w, max_h / h)`, so images are never
/// upscaled. Each side is rounded and kept at least 1 pixel.
///
/// # Examples
/// ```
/// # use quire::imaging::{fit_within, ThumbnailBounds};
/// // 1200x800 into 360x240 → exactly the box
/// assert_eq!(fit_within((1200, 800), ThumbnailBounds::default()), (360, 240));
///
/// // Small images keep their size
/// assert_eq!(fit_within((100, 50), ThumbnailBounds::default()), (100, 50));
/// ```
pub fn fit_within(original: (u32, u32), bounds: ThumbnailBounds) -> (u32, u32) {
    let (w, h) = original;
    let scale = 1.0f64
        .min(bounds.max_width as f64 / w as f64)
        .min(bounds.max_height as f64 / h as f64);

    let out_w = ((w as f64 * scale).round() as u32).max(1);
    let out_h = ((h as f64 * scale).round() as u32).max(1);
    (out_w, out_h)
}

/// Sizes for a progressive downscale from `current` to `target`.
///
/// Each step shrinks a dimension by at most half, never below its target.
/// The last entry is always `target`; when `current` already equals
/// `target` the result is that single size.
///
/// # Examples
/// ```
/// # use quire::imaging::halving_steps;
/// assert_eq!(
///     halving_steps((1600, 1200), (320, 240)),
///     vec![(800, 600), (400, 300), (320, 240)]
/// );
/// ```
pub fn halving_steps(current: (u32, u32), target: (u32, u32)) -> Vec<(u32, u32)> {
    let (mut w, mut h) = current;
    let (tw, th) = target;
    let mut steps = Vec::new();

    while w > tw || h > th {
        if w > tw {
            w = tw.max(w / 2);
        }
        if h > th {
            h = th.max(h / 2);
        }
        steps.push((w, h));
    }

    if steps.last() != Some(&target) {
        steps.push(target);
    }
    steps
}
