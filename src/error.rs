use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::PathBuf,
};

use safetensors::SafeTensorError;

/// The result type used in the entire inference crate.
pub type Result<T> = std::result::Result<T, InferErr>;

/// The inference crate's error type.
///
/// None of these errors is transient, retrying the failed operation with the same input always
/// yields the same outcome.
#[derive(Debug)]
pub enum InferErr {
    /// The weight container does not exist.
    WeightStoreNotFound { path: PathBuf },
    /// The weight container was read but did not hold enough layer candidates.
    MalformedWeightStore { conv: usize, dense: usize },
    /// The weight container could not be read or decoded.
    WeightStoreReadError { what: String },
    /// A dimension contract between two tensors was violated.
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
}

impl Display for InferErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferErr::WeightStoreNotFound { path } => {
                write!(f, "weight store not found at '{}'", path.display())
            }
            InferErr::MalformedWeightStore { conv, dense } => write!(
                f,
                "malformed weight store, expected at least 2 conv and 2 dense layers, found {conv} conv and {dense} dense"
            ),
            InferErr::WeightStoreReadError { what } => {
                write!(f, "failed to read weight store: {what}")
            }
            InferErr::ShapeMismatch {
                what,
                expected,
                got,
            } => write!(
                f,
                "shape mismatch in {what}, expected {expected} and got {got}"
            ),
        }
    }
}

impl Error for InferErr {}

impl From<io::Error> for InferErr {
    fn from(value: io::Error) -> Self {
        Self::WeightStoreReadError {
            what: value.to_string(),
        }
    }
}

impl From<SafeTensorError> for InferErr {
    fn from(value: SafeTensorError) -> Self {
        Self::WeightStoreReadError {
            what: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_message_carries_counts() {
        let err = InferErr::MalformedWeightStore { conv: 2, dense: 1 };
        let msg = err.to_string();

        assert!(msg.contains("2 conv"));
        assert!(msg.contains("1 dense"));
    }

    #[test]
    fn io_errors_become_read_errors() {
        let err: InferErr = io::Error::new(io::ErrorKind::UnexpectedEof, "truncated").into();
        assert!(matches!(err, InferErr::WeightStoreReadError { .. }));
    }
}
