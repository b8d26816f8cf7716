use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::{InitErr, Result};
use crate::store::Tensor;

/// How the values of a freshly generated tensor are drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill {
    /// He (Kaiming) normal initialization, `N(0, sqrt(2 / fan_in))`.
    HeNormal { fan_in: usize },
    /// Every value is zero.
    Zeros,
}

impl Fill {
    /// Generates a tensor of `shape` drawing its values from `rng` in row-major order.
    ///
    /// # Returns
    /// The tensor, or an error if `fan_in` is zero.
    pub fn tensor<R: Rng + ?Sized>(self, rng: &mut R, shape: Vec<usize>) -> Result<Tensor> {
        let len = shape.iter().product();

        let data = match self {
            Fill::HeNormal { fan_in: 0 } => {
                return Err(InitErr::Distribution("fan_in must be greater than 0".into()));
            }
            Fill::HeNormal { fan_in } => {
                let normal = Normal::new(0., (2. / fan_in as f32).sqrt())?;
                normal.sample_iter(rng).take(len).collect()
            }
            Fill::Zeros => vec![0.; len],
        };

        Ok(Tensor::new(shape, data)?)
    }
}
