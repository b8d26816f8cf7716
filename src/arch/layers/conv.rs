use ndarray::{Array2, Array3, ArrayView3, Axis, linalg, parallel::prelude::*, s};

use crate::{
    InferErr, Result,
    arch::{ConvParams, activations::ActFn},
};

/// A valid-mode 2-D convolution: stride 1, no padding, no dilation.
///
/// The input is laid out as `(height, width, channels)`. Each output value is the inner product
/// of a `kh x kw x c_in` input patch with the kernel of its output channel, plus that channel's
/// bias. It is computed by unrolling every patch into a row of a matrix and multiplying that
/// matrix with the kernel reshaped to `(kh * kw * c_in, c_out)`.
#[derive(Debug, Clone)]
pub struct Conv<'p> {
    params: &'p ConvParams,
    act_fn: Option<ActFn>,
}

impl<'p> Conv<'p> {
    /// Creates a new `Conv`.
    ///
    /// # Arguments
    /// * `params` - The kernel and bias.
    /// * `act_fn` - An activation applied to every output value.
    pub fn new(params: &'p ConvParams, act_fn: Option<ActFn>) -> Self {
        Self { params, act_fn }
    }

    /// Convolves `x`, producing a `(h - kh + 1, w - kw + 1, c_out)` feature map.
    ///
    /// # Returns
    /// The feature map or a `ShapeMismatch` if the channels differ or the kernel does not fit.
    pub fn forward(&self, x: ArrayView3<f32>) -> Result<Array3<f32>> {
        let (h, w, c_in) = x.dim();
        let (kh, kw, k_in, c_out) = self.params.kernel().dim();

        if c_in != k_in {
            return Err(InferErr::ShapeMismatch {
                what: "conv input channels",
                expected: k_in,
                got: c_in,
            });
        }

        if kh > h || kw > w {
            return Err(InferErr::ShapeMismatch {
                what: "conv input side",
                expected: kh.max(kw),
                got: h.min(w),
            });
        }

        let (oh, ow) = (h - kh + 1, w - kw + 1);
        let patch_len = kh * kw * c_in;

        let mut patches = Array2::zeros((oh * ow, patch_len));
        patches
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(pos, mut row)| {
                let (i, j) = (pos / ow, pos % ow);
                let patch = x.slice(s![i..i + kh, j..j + kw, ..]);
                row.iter_mut().zip(patch.iter()).for_each(|(r, &p)| *r = p);
            });

        let kernel = self
            .params
            .kernel()
            .into_shape_with_order((patch_len, c_out))
            .map_err(|_| InferErr::ShapeMismatch {
                what: "conv kernel layout",
                expected: patch_len * c_out,
                got: self.params.kernel().len(),
            })?;

        let mut z = Array2::zeros((oh * ow, c_out));
        linalg::general_mat_mul(1.0, &patches, &kernel, 0.0, &mut z);
        z += &self.params.bias();

        if let Some(act_fn) = &self.act_fn {
            z.mapv_inplace(|z| act_fn.f(z));
        }

        let (z, _) = z.into_raw_vec_and_offset();
        let len = z.len();

        Array3::from_shape_vec((oh, ow, c_out), z).map_err(|_| InferErr::ShapeMismatch {
            what: "conv output",
            expected: oh * ow * c_out,
            got: len,
        })
    }
}
