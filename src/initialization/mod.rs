mod architecture;
mod error;
mod fill;

pub use architecture::{Architecture, EMOTION_PRIOR};
pub use error::{InitErr, Result};
pub use fill::Fill;
