//! Pure calculation functions for texture dimensions and format policy.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::TargetFormat;

/// Calculate output dimensions that fit within `limit` on both sides.
///
/// Images already within the limit pass through unchanged. Larger images are
/// scaled by a single ratio, `min(limit/width, limit/height)`, so the aspect
/// ratio is preserved and the larger side lands on `limit`. Each side is
/// rounded to the nearest pixel and never drops below 1.
///
/// # Examples
/// ```
/// # use texproc::imaging::calculate_fit_dimensions;
/// assert_eq!(calculate_fit_dimensions((4096, 2048), 1024), (1024, 512));
/// assert_eq!(calculate_fit_dimensions((800, 600), 1024), (800, 600));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), limit: u32) -> (u32, u32) {
    let (w, h) = source;
    if w <= limit && h <= limit {
        return (w, h);
    }

    let ratio = (limit as f64 / w as f64).min(limit as f64 / h as f64);
    let scale = |side: u32| ((side as f64 * ratio).round() as u32).max(1);
    (scale(w), scale(h))
}

/// Pick the format actually written for a source.
///
/// A source with alpha never goes into an alpha-incapable format; BC1 is
/// promoted to BC3 instead. Callers compare the result against `requested`
/// to report the substitution.
pub fn resolve_format(requested: TargetFormat, has_alpha: bool) -> TargetFormat {
    if has_alpha && !requested.supports_alpha() {
        TargetFormat::Bc3
    } else {
        requested
    }
}
