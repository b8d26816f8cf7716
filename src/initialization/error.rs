use std::{
    error::Error,
    fmt::{self, Display},
};

use rand_distr::NormalError;

use crate::InferErr;

/// The result type of the parameter initialization module.
pub type Result<T> = std::result::Result<T, InitErr>;

/// Errors raised while generating a fresh parameter set.
#[derive(Debug)]
pub enum InitErr {
    /// The distribution could not be built with the derived parameters.
    Distribution(String),
    /// The generated tensors do not form a valid parameter set.
    Params(InferErr),
}

impl From<NormalError> for InitErr {
    fn from(value: NormalError) -> Self {
        Self::Distribution(value.to_string())
    }
}

impl From<InferErr> for InitErr {
    fn from(value: InferErr) -> Self {
        Self::Params(value)
    }
}

impl Display for InitErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitErr::Distribution(e) => write!(f, "invalid distribution: {e}"),
            InitErr::Params(e) => write!(f, "invalid parameters: {e}"),
        }
    }
}

impl Error for InitErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InitErr::Params(e) => Some(e),
            _ => None,
        }
    }
}
