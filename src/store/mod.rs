mod container;
pub mod discovery;
mod keras;
mod loader;
mod node;

pub use container::Container;
pub use keras::to_keras_container;
pub use loader::{TOP_LEVEL_GROUP, load, load_file};
pub use node::{Group, Node, Tensor};
