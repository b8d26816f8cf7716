use ndarray::{Array1, ArrayView1};

use crate::{
    InferErr, Result,
    arch::{DenseParams, activations::ActFn},
};

/// A fully connected layer, `y = x · W + b`, optionally followed by an activation.
#[derive(Debug, Clone)]
pub struct Dense<'p> {
    params: &'p DenseParams,
    act_fn: Option<ActFn>,
}

impl<'p> Dense<'p> {
    /// Creates a new `Dense`.
    ///
    /// # Arguments
    /// * `params` - The weights and bias.
    /// * `act_fn` - An activation applied to every output value.
    pub fn new(params: &'p DenseParams, act_fn: Option<ActFn>) -> Self {
        Self { params, act_fn }
    }

    /// Returns the amount of inputs this layer expects.
    pub fn inputs(&self) -> usize {
        self.params.inputs()
    }

    /// Multiplies the row vector `x` by the weights and adds the bias.
    ///
    /// # Returns
    /// The outputs or a `ShapeMismatch` if `x` does not have one value per weight row.
    pub fn forward(&self, x: ArrayView1<f32>) -> Result<Array1<f32>> {
        if x.len() != self.inputs() {
            return Err(InferErr::ShapeMismatch {
                what: "dense inputs",
                expected: self.inputs(),
                got: x.len(),
            });
        }

        let mut z = x.dot(&self.params.weights()) + self.params.bias();

        if let Some(act_fn) = &self.act_fn {
            z.mapv_inplace(|z| act_fn.f(z));
        }

        Ok(z)
    }
}
