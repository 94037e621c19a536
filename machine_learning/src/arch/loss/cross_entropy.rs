use ndarray::{ArrayView2, Axis};

use super::LossFn;

/// Softmax cross-entropy over raw logits.
///
/// Targets are expected one-hot encoded (or as a probability distribution per row).
#[derive(Debug, Default, Clone, Copy)]
pub struct CrossEntropy;

impl CrossEntropy {
    /// Returns a new `CrossEntropy`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for CrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let nrows = y_pred.nrows();
        if nrows == 0 {
            return 0.;
        }

        let total: f32 = y_pred
            .axis_iter(Axis(0))
            .zip(y.axis_iter(Axis(0)))
            .map(|(logits, target)| {
                let max = logits.fold(f32::NEG_INFINITY, |m, &z| m.max(z));
                let log_sum_exp = logits.mapv(|z| (z - max).exp()).sum().ln() + max;

                logits
                    .iter()
                    .zip(target)
                    .map(|(&z, &t)| t * (log_sum_exp - z))
                    .sum::<f32>()
            })
            .sum();

        total / nrows as f32
    }
}
