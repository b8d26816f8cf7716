use std::{
    error::Error,
    fmt::{self, Display},
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::classify::EMOTIONS;

/// What the host does when the weights cannot be loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadFailurePolicy {
    /// Propagate the load error.
    #[default]
    Abort,
    /// Keep serving with a fixed distribution.
    Fallback,
}

/// The configuration of a hosted classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path to the weight container.
    pub weights: PathBuf,
    /// Side of the square images the network was sized for.
    pub input_side: usize,
    /// One name per network output, in output order.
    pub labels: Vec<String>,
    pub on_load_failure: LoadFailurePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: PathBuf::from("emotion_model.safetensors"),
            input_side: 48,
            labels: EMOTIONS.iter().map(|s| s.to_string()).collect(),
            on_load_failure: LoadFailurePolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Reads the configuration from a JSON file, missing fields take their default value.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigErr> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigErr::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigErr> {
        let config: Self = serde_json::from_str(content).map_err(ConfigErr::Json)?;

        if config.labels.is_empty() {
            return Err(ConfigErr::Invalid("labels must not be empty".into()));
        }
        if config.input_side == 0 {
            return Err(ConfigErr::Invalid("input_side must be greater than 0".into()));
        }

        Ok(config)
    }
}

/// Errors reading an [`EngineConfig`].
#[derive(Debug)]
pub enum ConfigErr {
    Io { path: PathBuf, source: io::Error },
    Json(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigErr::Io { path, source } => {
                write!(f, "cannot read '{}': {source}", path.display())
            }
            ConfigErr::Json(e) => write!(f, "invalid JSON: {e}"),
            ConfigErr::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl Error for ConfigErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigErr::Io { source, .. } => Some(source),
            ConfigErr::Json(e) => Some(e),
            ConfigErr::Invalid(_) => None,
        }
    }
}
