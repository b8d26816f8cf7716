use ndarray::{Array3, ArrayView3};

/// Non-overlapping 2x2 max pooling with stride 2, applied per channel.
///
/// A trailing row or column that cannot fill a whole window is dropped, so a `(h, w, c)` input
/// becomes `(h / 2, w / 2, c)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaxPool;

impl MaxPool {
    pub fn new() -> Self {
        Self
    }

    pub fn forward(&self, x: ArrayView3<f32>) -> Array3<f32> {
        let (h, w, c) = x.dim();

        Array3::from_shape_fn((h / 2, w / 2, c), |(i, j, k)| {
            let (r, q) = (2 * i, 2 * j);
            x[[r, q, k]]
                .max(x[[r, q + 1, k]])
                .max(x[[r + 1, q, k]])
                .max(x[[r + 1, q + 1, k]])
        })
    }
}
