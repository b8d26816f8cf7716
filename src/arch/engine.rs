use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView2};
use rayon::prelude::*;

use super::{ParameterSet, Sequential};
use crate::Result;

/// A probability per label, summing to one.
pub type Probabilities = Array1<f32>;

/// Runs the classifier over one normalized, single channel, square image.
///
/// This is a pure function of its arguments: it keeps no state between calls and every
/// intermediate buffer is owned by the call.
///
/// # Arguments
/// * `params` - The network parameters.
/// * `image` - Grayscale values in `[0, 1]`, with the side the parameters were sized for.
///
/// # Returns
/// The probability of each label or a `ShapeMismatch` if the image does not fit the network.
pub fn predict(params: &ParameterSet, image: ArrayView2<f32>) -> Result<Probabilities> {
    Sequential::classifier(params).forward(image)
}

/// Shares one read-only `ParameterSet` between any amount of concurrent predictions.
#[derive(Debug, Clone)]
pub struct Engine {
    params: Arc<ParameterSet>,
}

impl Engine {
    pub fn new(params: ParameterSet) -> Self {
        Self::from_shared(Arc::new(params))
    }

    pub fn from_shared(params: Arc<ParameterSet>) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn num_labels(&self) -> usize {
        self.params.num_labels()
    }

    /// See [`predict`].
    pub fn predict(&self, image: ArrayView2<f32>) -> Result<Probabilities> {
        predict(&self.params, image)
    }

    /// Predicts every image in parallel, keeping the input order.
    pub fn predict_batch(&self, images: &[Array2<f32>]) -> Vec<Result<Probabilities>> {
        images
            .par_iter()
            .map(|image| self.predict(image.view()))
            .collect()
    }
}
