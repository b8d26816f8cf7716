use ndarray::{Array2, ArrayView2};

use crate::{InferErr, Result};

/// Resizes a grayscale image to `side x side` with bilinear interpolation and scales its values
/// from `[0, 255]` into `[0, 1]`.
///
/// Sampling uses pixel centers: output pixel `i` reads the source at `(i + 0.5) * scale - 0.5`,
/// clamped to the image bounds.
pub fn normalize(pixels: ArrayView2<u8>, side: usize) -> Result<Array2<f32>> {
    let (h, w) = pixels.dim();
    if h == 0 || w == 0 {
        return Err(InferErr::ShapeMismatch {
            what: "image pixels",
            expected: side * side,
            got: 0,
        });
    }

    let sy = h as f32 / side as f32;
    let sx = w as f32 / side as f32;

    let resized = Array2::from_shape_fn((side, side), |(i, j)| {
        let (y0, y1, fy) = neighbours(i, sy, h);
        let (x0, x1, fx) = neighbours(j, sx, w);
        let px = |y: usize, x: usize| pixels[[y, x]] as f32;

        let top = px(y0, x0) * (1. - fx) + px(y0, x1) * fx;
        let bottom = px(y1, x0) * (1. - fx) + px(y1, x1) * fx;
        top * (1. - fy) + bottom * fy
    });

    Ok(resized.mapv(|v| v / 255.))
}

/// The two source indices surrounding output index `i` and the weight of the second one.
fn neighbours(i: usize, scale: f32, len: usize) -> (usize, usize, f32) {
    let src = ((i as f32 + 0.5) * scale - 0.5).clamp(0., (len - 1) as f32);
    let lo = src.floor() as usize;
    let hi = (lo + 1).min(len - 1);
    (lo, hi, src - lo as f32)
}
