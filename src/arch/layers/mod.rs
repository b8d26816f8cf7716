mod conv;
mod dense;
mod layer;
mod pool;

pub use conv::Conv;
pub use dense::Dense;
pub use layer::{Features, Layer};
pub use pool::MaxPool;
