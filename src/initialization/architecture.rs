use rand::Rng;

use super::{Fill, InitErr, Result};
use crate::{
    InferErr,
    arch::{ConvParams, DenseParams, ParameterSet},
    store::Tensor,
};

/// A small prior over the six emotion labels, favouring the neutral and happy outputs of an
/// untrained network.
pub const EMOTION_PRIOR: [f32; 6] = [0.0, -0.1, 0.2, 0.3, -0.1, 0.0];

/// The hyper parameters of the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Architecture {
    /// Side of the square input image.
    pub side: usize,
    /// Side of the square convolution kernels.
    pub window: usize,
    /// Output channels of each convolution.
    pub filters: [usize; 2],
    /// Outputs of the first dense layer.
    pub hidden: usize,
    /// Outputs of the second dense layer.
    pub labels: usize,
    /// Bias of the second dense layer, zeros when `None`.
    pub output_bias: Option<Vec<f32>>,
}

impl Default for Architecture {
    fn default() -> Self {
        Self {
            side: 48,
            window: 3,
            filters: [32, 64],
            hidden: 128,
            labels: 6,
            output_bias: Some(EMOTION_PRIOR.to_vec()),
        }
    }
}

impl Architecture {
    /// The length of the flattened features after both convolution and pooling stages, or
    /// `None` if the input is too small for the kernels.
    pub fn feature_len(&self) -> Option<usize> {
        let mut side = self.side;
        for _ in self.filters {
            side = (side + 1).checked_sub(self.window)? / 2;
        }

        Some(side * side * self.filters[1])
    }

    /// Generates a parameter set with He normal kernels and zero biases.
    ///
    /// Every kernel is drawn from the same random stream in layer order, so the same `rng` state
    /// always yields the same parameters.
    pub fn he_normal<R: Rng>(&self, mut rng: R) -> Result<ParameterSet> {
        let feature_len = self.feature_len().ok_or(InitErr::Params(InferErr::ShapeMismatch {
            what: "input side",
            expected: 2 * self.window,
            got: self.side,
        }))?;

        let rng = &mut rng;
        let k = self.window;
        let [f1, f2] = self.filters;

        let conv1 = ConvParams::from_tensors(
            &Fill::HeNormal { fan_in: k * k }.tensor(rng, vec![k, k, 1, f1])?,
            &Fill::Zeros.tensor(rng, vec![f1])?,
        )?;

        let conv2 = ConvParams::from_tensors(
            &Fill::HeNormal { fan_in: k * k * f1 }.tensor(rng, vec![k, k, f1, f2])?,
            &Fill::Zeros.tensor(rng, vec![f2])?,
        )?;

        let dense1 = DenseParams::from_tensors(
            &Fill::HeNormal {
                fan_in: feature_len,
            }
            .tensor(rng, vec![feature_len, self.hidden])?,
            &Fill::Zeros.tensor(rng, vec![self.hidden])?,
        )?;

        let output_bias = match &self.output_bias {
            Some(bias) => Tensor::new(vec![bias.len()], bias.clone())?,
            None => Fill::Zeros.tensor(rng, vec![self.labels])?,
        };

        let dense2 = DenseParams::from_tensors(
            &Fill::HeNormal {
                fan_in: self.hidden,
            }
            .tensor(rng, vec![self.hidden, self.labels])?,
            &output_bias,
        )?;

        Ok(ParameterSet::new(conv1, conv2, dense1, dense2)?)
    }
}
