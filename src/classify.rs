use ndarray::ArrayView1;

use crate::{InferErr, Result};

/// The labels of the emotion model, in output order.
pub const EMOTIONS: [&str; 6] = ["Angry", "Fear", "Happy", "Neutral", "Sad", "Surprise"];

/// The most likely label of a prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub index: usize,
    pub label: String,
    /// The probability of the label as a percentage.
    pub confidence: f32,
}

/// Maps network outputs to human readable names.
#[derive(Debug, Clone, PartialEq)]
pub struct Labels {
    names: Vec<String>,
}

impl Default for Labels {
    fn default() -> Self {
        Self::new(EMOTIONS)
    }
}

impl Labels {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Picks the most likely label, the first one on ties.
    ///
    /// # Returns
    /// The classification or a `ShapeMismatch` if there is not one probability per label.
    pub fn classify(&self, probs: ArrayView1<f32>) -> Result<Classification> {
        if probs.len() != self.len() || self.is_empty() {
            return Err(InferErr::ShapeMismatch {
                what: "label count",
                expected: self.len(),
                got: probs.len(),
            });
        }

        let (index, &p) = probs
            .iter()
            .enumerate()
            .fold((0, &probs[0]), |best, (i, p)| if p > best.1 { (i, p) } else { best });

        Ok(Classification {
            index,
            label: self.names[index].clone(),
            confidence: p * 100.,
        })
    }
}
