// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Resize policy — pure dimension math, no I/O and no pixels.

/// Compute bounded output dimensions for a raster, preserving aspect ratio.
///
/// Inputs with both edges at or below `max_dimension` pass through unchanged.
/// Larger inputs are scaled uniformly by `min(max/w, max/h)` so the longer
/// edge lands exactly on `max_dimension`. Fractional results are rounded to
/// nearest, and dimensions never collapse to zero for positive input.
///
/// # Examples
/// ```
/// # use oddnet_dehaze::resize::target_dimensions;
/// // Within bounds: unchanged.
/// assert_eq!(target_dimensions(800, 600, 1024), (800, 600));
///
/// // 2:1 landscape above the bound: ratio 0.5 applied to both edges.
/// assert_eq!(target_dimensions(2048, 1024, 1024), (1024, 512));
/// ```
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }

    let ratio = f64::min(
        max_dimension as f64 / width as f64,
        max_dimension as f64 / height as f64,
    );

    let target_w = (width as f64 * ratio).round().max(1.0) as u32;
    let target_h = (height as f64 * ratio).round().max(1.0) as u32;
    (target_w, target_h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_bounds_is_identity() {
        assert_eq!(target_dimensions(1024, 1024, 1024), (1024, 1024));
        assert_eq!(target_dimensions(1, 1, 1024), (1, 1));
        assert_eq!(target_dimensions(640, 480, 1024), (640, 480));
    }

    #[test]
    fn landscape_scales_to_bound() {
        // Reference scenario: 2048x1024 -> 1024x512.
        assert_eq!(target_dimensions(2048, 1024, 1024), (1024, 512));
    }

    #[test]
    fn portrait_scales_to_bound() {
        assert_eq!(target_dimensions(1024, 2048, 1024), (512, 1024));
    }

    #[test]
    fn longer_edge_lands_exactly_on_max() {
        for &(w, h) in &[(3000u32, 2000u32), (1025, 1024), (5000, 100), (1280, 4096)] {
            let (tw, th) = target_dimensions(w, h, 1024);
            assert_eq!(tw.max(th), 1024, "input {w}x{h} gave {tw}x{th}");
        }
    }

    #[test]
    fn aspect_ratio_preserved_within_one_pixel() {
        let (w, h) = (3841u32, 2161u32);
        let (tw, th) = target_dimensions(w, h, 1024);
        let expected_th = (h as f64 * (tw as f64 / w as f64)).round() as u32;
        assert!(
            th.abs_diff(expected_th) <= 1,
            "aspect drifted: {tw}x{th} from {w}x{h}"
        );
    }

    #[test]
    fn extreme_aspect_never_produces_zero() {
        // Ratio 0.01 would round 1 px wide down to 0 without the floor.
        let (tw, th) = target_dimensions(1, 100_000, 1000);
        assert!(tw >= 1);
        assert_eq!(th, 1000);
    }

    #[test]
    fn rounding_is_to_nearest() {
        // 1500x1001, max 1024: ratio = 1024/1500, 1001 * ratio = 683.34 -> 683.
        let (tw, th) = target_dimensions(1500, 1001, 1024);
        assert_eq!(tw, 1024);
        assert_eq!(th, 683);
    }
}
