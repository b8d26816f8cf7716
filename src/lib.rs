pub mod arch;
pub mod classify;
pub mod config;
pub mod error;
pub mod initialization;
pub mod predictor;
pub mod preprocess;
pub mod store;

pub use arch::{Engine, ParameterSet, Probabilities, predict};
pub use error::{InferErr, Result};
pub use store::{Container, load, load_file};
