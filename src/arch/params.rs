use ndarray::{Array1, Array2, Array4, ArrayView1, ArrayView2, ArrayView4};

use crate::{InferErr, Result, store::Tensor};

/// The kernel and bias of a valid-mode 2-D convolution.
///
/// The kernel is laid out as `(kernel height, kernel width, input channels, output channels)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvParams {
    kernel: Array4<f32>,
    bias: Array1<f32>,
}

impl ConvParams {
    /// Creates a new `ConvParams`.
    ///
    /// # Returns
    /// The parameters or an error if the bias length differs from the output channels.
    pub fn new(kernel: Array4<f32>, bias: Array1<f32>) -> Result<Self> {
        let out_channels = kernel.dim().3;
        if bias.len() != out_channels {
            return Err(InferErr::ShapeMismatch {
                what: "conv bias length",
                expected: out_channels,
                got: bias.len(),
            });
        }

        Ok(Self {
            kernel: kernel.as_standard_layout().into_owned(),
            bias,
        })
    }

    /// Builds the parameters out of two raw datasets.
    pub fn from_tensors(kernel: &Tensor, bias: &Tensor) -> Result<Self> {
        let &[kh, kw, c_in, c_out] = kernel.shape() else {
            return Err(InferErr::ShapeMismatch {
                what: "conv kernel rank",
                expected: 4,
                got: kernel.rank(),
            });
        };

        let kernel = Array4::from_shape_vec((kh, kw, c_in, c_out), kernel.data().to_vec())
            .map_err(|_| InferErr::ShapeMismatch {
                what: "conv kernel length",
                expected: kh * kw * c_in * c_out,
                got: kernel.data().len(),
            })?;

        Self::new(kernel, vector(bias, "conv bias rank")?)
    }

    pub fn kernel(&self) -> ArrayView4<'_, f32> {
        self.kernel.view()
    }

    pub fn bias(&self) -> ArrayView1<'_, f32> {
        self.bias.view()
    }

    /// The `(height, width)` of the kernel window.
    pub fn window(&self) -> (usize, usize) {
        let (kh, kw, _, _) = self.kernel.dim();
        (kh, kw)
    }

    pub fn in_channels(&self) -> usize {
        self.kernel.dim().2
    }

    pub fn out_channels(&self) -> usize {
        self.kernel.dim().3
    }
}

/// The weights and bias of a fully connected layer, `y = x · W + b`.
///
/// The weights are laid out as `(inputs, outputs)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseParams {
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl DenseParams {
    /// Creates a new `DenseParams`.
    ///
    /// # Returns
    /// The parameters or an error if the bias length differs from the amount of outputs.
    pub fn new(weights: Array2<f32>, bias: Array1<f32>) -> Result<Self> {
        if bias.len() != weights.ncols() {
            return Err(InferErr::ShapeMismatch {
                what: "dense bias length",
                expected: weights.ncols(),
                got: bias.len(),
            });
        }

        Ok(Self { weights, bias })
    }

    /// Builds the parameters out of two raw datasets.
    pub fn from_tensors(weights: &Tensor, bias: &Tensor) -> Result<Self> {
        let &[d_in, d_out] = weights.shape() else {
            return Err(InferErr::ShapeMismatch {
                what: "dense kernel rank",
                expected: 2,
                got: weights.rank(),
            });
        };

        let weights = Array2::from_shape_vec((d_in, d_out), weights.data().to_vec()).map_err(
            |_| InferErr::ShapeMismatch {
                what: "dense kernel length",
                expected: d_in * d_out,
                got: weights.data().len(),
            },
        )?;

        Self::new(weights, vector(bias, "dense bias rank")?)
    }

    pub fn weights(&self) -> ArrayView2<'_, f32> {
        self.weights.view()
    }

    pub fn bias(&self) -> ArrayView1<'_, f32> {
        self.bias.view()
    }

    pub fn inputs(&self) -> usize {
        self.weights.nrows()
    }

    pub fn outputs(&self) -> usize {
        self.weights.ncols()
    }
}

/// Everything a forward pass needs: two convolutions followed by two dense layers.
///
/// Built once and never mutated, so it can be shared between threads behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    conv: [ConvParams; 2],
    dense: [DenseParams; 2],
}

impl ParameterSet {
    /// Creates a new `ParameterSet`.
    ///
    /// Only the contracts between consecutive layers are checked here, the ones that depend on
    /// the input image are checked on each forward pass.
    ///
    /// # Returns
    /// The parameter set or a `ShapeMismatch` if two consecutive layers do not fit together.
    pub fn new(
        conv1: ConvParams,
        conv2: ConvParams,
        dense1: DenseParams,
        dense2: DenseParams,
    ) -> Result<Self> {
        if conv2.in_channels() != conv1.out_channels() {
            return Err(InferErr::ShapeMismatch {
                what: "conv2 input channels",
                expected: conv1.out_channels(),
                got: conv2.in_channels(),
            });
        }

        if dense2.inputs() != dense1.outputs() {
            return Err(InferErr::ShapeMismatch {
                what: "dense2 inputs",
                expected: dense1.outputs(),
                got: dense2.inputs(),
            });
        }

        Ok(Self {
            conv: [conv1, conv2],
            dense: [dense1, dense2],
        })
    }

    pub fn conv(&self) -> &[ConvParams; 2] {
        &self.conv
    }

    pub fn dense(&self) -> &[DenseParams; 2] {
        &self.dense
    }

    /// The amount of labels the output distribution covers.
    pub fn num_labels(&self) -> usize {
        self.dense[1].outputs()
    }

    /// The flattened feature length produced for a square input of the given side, or `None`
    /// if the input is too small for the kernels.
    pub fn feature_len(&self, side: usize) -> Option<usize> {
        let mut size = (side, side);

        for conv in &self.conv {
            let (kh, kw) = conv.window();
            let h = (size.0 + 1).checked_sub(kh)?;
            let w = (size.1 + 1).checked_sub(kw)?;
            size = (h / 2, w / 2);
        }

        Some(size.0 * size.1 * self.conv[1].out_channels())
    }
}

fn vector(tensor: &Tensor, what: &'static str) -> Result<Array1<f32>> {
    if tensor.rank() != 1 {
        return Err(InferErr::ShapeMismatch {
            what,
            expected: 1,
            got: tensor.rank(),
        });
    }

    Ok(Array1::from(tensor.data().to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv(kh: usize, c_in: usize, c_out: usize) -> ConvParams {
        ConvParams::new(Array4::zeros((kh, kh, c_in, c_out)), Array1::zeros(c_out)).unwrap()
    }

    fn dense(d_in: usize, d_out: usize) -> DenseParams {
        DenseParams::new(Array2::zeros((d_in, d_out)), Array1::zeros(d_out)).unwrap()
    }

    #[test]
    fn conv_bias_must_match_channels() {
        let err = ConvParams::new(Array4::zeros((3, 3, 1, 4)), Array1::zeros(3)).unwrap_err();
        assert!(matches!(
            err,
            InferErr::ShapeMismatch {
                expected: 4,
                got: 3,
                ..
            }
        ));
    }

    #[test]
    fn from_tensors_checks_rank() {
        let kernel = Tensor::new(vec![3, 3], vec![0.; 9]).unwrap();
        let bias = Tensor::new(vec![3], vec![0.; 3]).unwrap();

        assert!(ConvParams::from_tensors(&kernel, &bias).is_err());
        assert!(DenseParams::from_tensors(&kernel, &bias).is_ok());
    }

    #[test]
    fn consecutive_layers_must_fit() {
        let err = ParameterSet::new(conv(3, 1, 4), conv(3, 5, 8), dense(8, 2), dense(2, 6));
        assert!(err.is_err());

        let err = ParameterSet::new(conv(3, 1, 4), conv(3, 4, 8), dense(8, 3), dense(2, 6));
        assert!(err.is_err());
    }

    #[test]
    fn feature_len_follows_conv_and_pool() {
        let params =
            ParameterSet::new(conv(3, 1, 32), conv(3, 32, 64), dense(6400, 128), dense(128, 6))
                .unwrap();

        assert_eq!(params.feature_len(48), Some(10 * 10 * 64));
        assert_eq!(params.feature_len(3), None);
        assert_eq!(params.num_labels(), 6);
    }
}
