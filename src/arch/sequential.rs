use ndarray::{Array1, ArrayView2, Axis};

use super::{
    ParameterSet,
    activations::ActFn,
    layers::{Conv, Dense, Features, Layer, MaxPool},
};
use crate::{InferErr, Result};

/// A sequential model: the output of each layer is the input of the next one.
#[derive(Debug, Clone)]
pub struct Sequential<'p> {
    layers: Vec<Layer<'p>>,
}

impl<'p> Sequential<'p> {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer<'p>>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    /// Builds the classifier described by `params`:
    ///
    /// conv1 → relu → pool → conv2 → relu → pool → flatten → dense1 → relu → dense2 → softmax
    pub fn classifier(params: &'p ParameterSet) -> Self {
        let [conv1, conv2] = params.conv();
        let [dense1, dense2] = params.dense();

        Self::new([
            Layer::Conv(Conv::new(conv1, Some(ActFn::relu()))),
            Layer::MaxPool(MaxPool::new()),
            Layer::Conv(Conv::new(conv2, Some(ActFn::relu()))),
            Layer::MaxPool(MaxPool::new()),
            Layer::Flatten,
            Layer::Dense(Dense::new(dense1, Some(ActFn::relu()))),
            Layer::Dense(Dense::new(dense2, None)),
            Layer::Softmax,
        ])
    }

    /// Makes a forward pass of a single channel image through the network.
    ///
    /// # Returns
    /// The output of the last layer as a flat vector or an error if any layer rejected its input.
    pub fn forward(&self, image: ArrayView2<f32>) -> Result<Array1<f32>> {
        let x = image.insert_axis(Axis(2)).to_owned();

        let y = self
            .layers
            .iter()
            .try_fold(Features::Spatial(x), |x, layer| layer.forward(x))?;

        match y {
            Features::Flat(y) => Ok(y),
            Features::Spatial(y) => Err(InferErr::ShapeMismatch {
                what: "model output rank",
                expected: 1,
                got: y.ndim(),
            }),
        }
    }
}
