use ndarray::{Array1, Array3};

use super::{Conv, Dense, MaxPool};
use crate::{InferErr, Result, arch::activations::softmax};

/// The intermediate values flowing between layers.
#[derive(Debug, Clone, PartialEq)]
pub enum Features {
    /// A `(height, width, channels)` feature map.
    Spatial(Array3<f32>),
    /// A flat vector.
    Flat(Array1<f32>),
}

impl Features {
    fn rank(&self) -> usize {
        match self {
            Features::Spatial(_) => 3,
            Features::Flat(_) => 1,
        }
    }

    fn spatial(self, what: &'static str) -> Result<Array3<f32>> {
        match self {
            Features::Spatial(x) => Ok(x),
            other => Err(InferErr::ShapeMismatch {
                what,
                expected: 3,
                got: other.rank(),
            }),
        }
    }

    fn flat(self, what: &'static str) -> Result<Array1<f32>> {
        match self {
            Features::Flat(x) => Ok(x),
            other => Err(InferErr::ShapeMismatch {
                what,
                expected: 1,
                got: other.rank(),
            }),
        }
    }
}

/// A stage of the forward pass.
#[derive(Debug, Clone)]
pub enum Layer<'p> {
    Conv(Conv<'p>),
    MaxPool(MaxPool),
    /// Linearizes a feature map in row, then column, then channel order.
    Flatten,
    Dense(Dense<'p>),
    Softmax,
}

impl<'p> Layer<'p> {
    pub fn forward(&self, x: Features) -> Result<Features> {
        let y = match self {
            Layer::Conv(l) => Features::Spatial(l.forward(x.spatial("conv input rank")?.view())?),
            Layer::MaxPool(l) => Features::Spatial(l.forward(x.spatial("pool input rank")?.view())),
            Layer::Flatten => match x {
                Features::Spatial(x) => Features::Flat(x.iter().copied().collect()),
                flat => flat,
            },
            Layer::Dense(l) => Features::Flat(l.forward(x.flat("dense input rank")?.view())?),
            Layer::Softmax => Features::Flat(softmax(x.flat("softmax input rank")?.view())),
        };

        Ok(y)
    }
}
