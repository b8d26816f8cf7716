use ndarray::{Array1, ArrayView1};

/// Turns raw logits into a probability distribution.
///
/// The maximum logit is subtracted before exponentiating so large logits cannot overflow.
pub fn softmax(logits: ArrayView1<f32>) -> Array1<f32> {
    let max = logits.fold(f32::NEG_INFINITY, |max, &z| max.max(z));
    let mut exp = logits.mapv(|z| (z - max).exp());
    let sum = exp.sum();

    exp /= sum;
    exp
}
