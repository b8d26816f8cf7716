use ndarray::{Array1, ArrayView2};

use crate::{
    InferErr, Result,
    arch::{Engine, Probabilities},
    config::{EngineConfig, LoadFailurePolicy},
    store,
};

/// The distribution served while no weights are available, peaked on the third label.
pub const FALLBACK_DISTRIBUTION: [f32; 6] = [0.05, 0.05, 0.80, 0.05, 0.03, 0.02];

/// Anything able to turn a normalized image into label probabilities.
pub trait Predictor: Send + Sync {
    fn predict(&self, image: ArrayView2<f32>) -> Result<Probabilities>;

    /// Whether the predictions ignore the input.
    fn is_degraded(&self) -> bool {
        false
    }
}

/// A predictor backed by the convolutional network.
#[derive(Debug, Clone)]
pub struct CnnPredictor {
    engine: Engine,
    side: usize,
}

impl CnnPredictor {
    pub fn new(engine: Engine, side: usize) -> Self {
        Self { engine, side }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

impl Predictor for CnnPredictor {
    fn predict(&self, image: ArrayView2<f32>) -> Result<Probabilities> {
        let (h, w) = image.dim();
        if h != self.side || w != self.side {
            return Err(InferErr::ShapeMismatch {
                what: "image side",
                expected: self.side,
                got: if h != self.side { h } else { w },
            });
        }

        self.engine.predict(image)
    }
}

/// A predictor that always answers the same distribution.
#[derive(Debug, Clone)]
pub struct FallbackPredictor {
    probs: Probabilities,
}

impl FallbackPredictor {
    /// Creates a predictor for `labels` outputs, using [`FALLBACK_DISTRIBUTION`] when it has the
    /// right length and a uniform distribution otherwise.
    pub fn new(labels: usize) -> Self {
        let probs = if labels == FALLBACK_DISTRIBUTION.len() {
            Array1::from(FALLBACK_DISTRIBUTION.to_vec())
        } else {
            Array1::from_elem(labels, 1. / labels.max(1) as f32)
        };

        Self { probs }
    }
}

impl Predictor for FallbackPredictor {
    fn predict(&self, _image: ArrayView2<f32>) -> Result<Probabilities> {
        Ok(self.probs.clone())
    }

    fn is_degraded(&self) -> bool {
        true
    }
}

/// Loads the weights named by `config` and applies its load failure policy.
///
/// # Returns
/// A network backed predictor, a [`FallbackPredictor`] if loading failed and the policy allows
/// it, or the load error otherwise.
pub fn load_predictor(config: &EngineConfig) -> Result<Box<dyn Predictor>> {
    let loaded = store::load_file(&config.weights).and_then(|params| {
        if params.num_labels() != config.labels.len() {
            return Err(InferErr::ShapeMismatch {
                what: "network outputs",
                expected: config.labels.len(),
                got: params.num_labels(),
            });
        }

        Ok(params)
    });

    match (loaded, config.on_load_failure) {
        (Ok(params), _) => Ok(Box::new(CnnPredictor::new(
            Engine::new(params),
            config.input_side,
        ))),
        (Err(e), LoadFailurePolicy::Fallback) => {
            log::warn!("failed to load weights ({e}), serving the fallback distribution");
            Ok(Box::new(FallbackPredictor::new(config.labels.len())))
        }
        (Err(e), LoadFailurePolicy::Abort) => Err(e),
    }
}
