pub mod activations;
mod engine;
pub mod layers;
mod params;
mod sequential;

pub use engine::{Engine, Probabilities, predict};
pub use params::{ConvParams, DenseParams, ParameterSet};
pub use sequential::Sequential;
