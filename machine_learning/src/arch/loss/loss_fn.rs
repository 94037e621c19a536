use ndarray::ArrayView2;

/// A function measuring how far a batch of predictions is from its targets.
pub trait LossFn {
    /// Returns the loss averaged over the batch.
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32;
}

impl<L: LossFn + ?Sized> LossFn for Box<L> {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        (**self).loss(y_pred, y)
    }
}
