use ndarray::{ArrayView1, ArrayView2, Axis};

/// A running average of a per-batch quantity.
#[derive(Debug, Clone)]
pub struct Metric {
    name: &'static str,
    sum: f64,
    count: usize,
}

impl Metric {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            sum: 0.,
            count: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Adds one more observation.
    pub fn update(&mut self, value: f32) {
        self.sum += f64::from(value);
        self.count += 1;
    }

    /// Returns the average of the observations so far, zero if there are none.
    pub fn avg(&self) -> f32 {
        if self.count == 0 {
            return 0.;
        }

        (self.sum / self.count as f64) as f32
    }
}

/// Returns the fraction of rows where the prediction matches the target.
///
/// Multi-column targets are compared by arg-max, single-column targets are thresholded at 0.5.
pub fn accuracy(y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
    let nrows = y_pred.nrows();
    if nrows == 0 {
        return 0.;
    }

    let hits = y_pred
        .axis_iter(Axis(0))
        .zip(y.axis_iter(Axis(0)))
        .filter(|(pred, target)| match pred.len() {
            1 => (pred[0] >= 0.5) == (target[0] >= 0.5),
            _ => argmax(*pred) == argmax(*target),
        })
        .count();

    hits as f32 / nrows as f32
}

fn argmax(row: ArrayView1<f32>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, max), (i, &v)| {
            if v > max { (i, v) } else { (best, max) }
        })
        .0
}
