// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fallback transform engine — deterministic per-pixel contrast boost with
// blue-tint reduction. This is the stand-in dehazing adjustment the pipeline
// uses whenever the accelerated model is unavailable.

use image::RgbaImage;
use rayon::prelude::*;
use tracing::debug;

/// Contrast boost applied to every colour channel.
const CONTRAST_BOOST: f32 = 1.3;

/// Extra attenuation applied to the blue channel to cut atmospheric tint.
const BLUE_TINT_REDUCTION: f32 = 0.9;

/// Bytes per RGBA pixel.
const PIXEL_STRIDE: usize = 4;

/// Apply the fallback dehazing adjustment, producing a fresh buffer of the
/// same dimensions.
///
/// Per pixel: `R' = min(255, R*1.3)`, `G' = min(255, G*1.3)`,
/// `B' = min(255, B*1.3*0.9)`; alpha passes through unchanged. Fractional
/// results are rounded to nearest. The operation is order-independent, so
/// rows are processed in parallel; output is byte-identical to a sequential
/// pass over the same input.
pub fn dehaze_fallback(input: &RgbaImage) -> RgbaImage {
    let (width, height) = input.dimensions();
    let mut data = input.as_raw().clone();

    let row_bytes = width as usize * PIXEL_STRIDE;
    if row_bytes > 0 {
        data.par_chunks_mut(row_bytes).for_each(|row| {
            for px in row.chunks_exact_mut(PIXEL_STRIDE) {
                px[0] = boost(px[0], CONTRAST_BOOST);
                px[1] = boost(px[1], CONTRAST_BOOST);
                px[2] = boost(px[2], CONTRAST_BOOST * BLUE_TINT_REDUCTION);
                // px[3] (alpha) is untouched.
            }
        });
    }

    debug!(width, height, "fallback transform applied");

    // Length is w*h*4 by construction — same buffer shape as the input.
    RgbaImage::from_raw(width, height, data)
        .expect("output buffer length matches input dimensions")
}

#[inline]
fn boost(channel: u8, factor: f32) -> u8 {
    (channel as f32 * factor).round().min(255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn uniform(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(px))
    }

    #[test]
    fn mid_gray_reference_values() {
        // (100,100,100,255) -> (130,130,117,255): 100*1.3 = 130, 100*1.17 = 117.
        let input = uniform(3, 2, [100, 100, 100, 255]);
        let out = dehaze_fallback(&input);
        assert_eq!(out.get_pixel(2, 1).0, [130, 130, 117, 255]);
    }

    #[test]
    fn pure_white_clamps_in_place() {
        let input = uniform(2, 2, [255, 255, 255, 255]);
        let out = dehaze_fallback(&input);
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn alpha_passes_through() {
        let input = uniform(4, 4, [10, 200, 250, 42]);
        let out = dehaze_fallback(&input);
        for px in out.pixels() {
            assert_eq!(px.0[3], 42);
        }
    }

    #[test]
    fn output_never_exceeds_channel_range() {
        // Every channel value at once; u8 arithmetic cannot go below 0, so
        // the property to check is the 255 ceiling.
        let mut input = RgbaImage::new(16, 16);
        for (i, px) in input.pixels_mut().enumerate() {
            let v = (i % 256) as u8;
            *px = Rgba([v, v.wrapping_add(97), v.wrapping_add(193), 255]);
        }
        let out = dehaze_fallback(&input);
        assert_eq!(out.dimensions(), (16, 16));
        // u8 storage enforces the bound; spot-check a known near-limit value.
        let near_limit = dehaze_fallback(&uniform(1, 1, [197, 196, 219, 255]));
        assert_eq!(near_limit.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn deterministic_across_invocations() {
        let mut input = RgbaImage::new(64, 48);
        for (i, px) in input.pixels_mut().enumerate() {
            *px = Rgba([
                (i * 7 % 256) as u8,
                (i * 13 % 256) as u8,
                (i * 29 % 256) as u8,
                (i * 3 % 256) as u8,
            ]);
        }
        let a = dehaze_fallback(&input);
        let b = dehaze_fallback(&input);
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn input_is_not_mutated() {
        let input = uniform(5, 5, [100, 100, 100, 255]);
        let before = input.clone();
        let _ = dehaze_fallback(&input);
        assert_eq!(input.as_raw(), before.as_raw());
    }

    #[test]
    fn black_stays_black() {
        let out = dehaze_fallback(&uniform(1, 1, [0, 0, 0, 0]));
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }
}
