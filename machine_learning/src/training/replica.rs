use std::num::NonZeroUsize;

use ndarray::{Array1, Array2, ArrayView2};

use super::Checkpoint;
use crate::{
    Result,
    arch::{Model, loss::LossFn},
    dataset::Dataset,
    error::check_size,
    estimation::{RandomGradientEstimator, update_model_given_seeds},
    metrics::{Metric, accuracy},
    optimization::Optimizer,
    params::ParamStore,
};

/// One participant's own copy of a model: the architecture, its parameters and the optimizer
/// that updates them.
pub struct Replica {
    model: Box<dyn Model>,
    store: ParamStore,
    optimizer: Box<dyn Optimizer>,
}

impl Replica {
    /// Creates a new `Replica`.
    ///
    /// # Arguments
    /// * `model` - The architecture.
    /// * `store` - The parameters, laid out as `model` expects.
    /// * `optimizer` - The optimizer, sized for the parameters.
    ///
    /// # Returns
    /// A new replica or an error if `store` doesn't follow the layout of `model`.
    pub fn new(
        model: Box<dyn Model>,
        store: ParamStore,
        optimizer: Box<dyn Optimizer>,
    ) -> Result<Self> {
        store.check_layout(&model.param_specs())?;

        Ok(Self {
            model,
            store,
            optimizer,
        })
    }

    pub fn model(&self) -> &dyn Model {
        self.model.as_ref()
    }

    pub fn store(&self) -> &ParamStore {
        &self.store
    }

    pub fn params(&self) -> &[f32] {
        self.store.params()
    }

    pub fn optimizer(&self) -> &dyn Optimizer {
        self.optimizer.as_ref()
    }

    /// Takes a snapshot of the parameters and the optimizer state tagged with `round`.
    pub fn checkpoint(&self, round: usize) -> Checkpoint {
        Checkpoint::new(round, self.store.params(), self.optimizer.state())
    }

    /// Brings the parameters and the optimizer state back to `checkpoint`.
    pub fn restore(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        check_size("checkpoint params", checkpoint.params().len(), self.store.len())?;
        self.optimizer.load_state(checkpoint.optimizer())?;
        self.store.load_params(checkpoint.params())
    }

    /// Makes a forward pass with the current parameters.
    pub fn forward(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.model.forward(self.store.params(), x)
    }

    /// Estimates the gradient over one batch and leaves it in the gradient buffer.
    ///
    /// # Returns
    /// The per-direction scalars of the estimation.
    pub fn estimate_grad(
        &mut self,
        estimator: &RandomGradientEstimator,
        seed: u64,
        x: ArrayView2<f32>,
        y: ArrayView2<f32>,
        loss_fn: &dyn LossFn,
    ) -> Result<Array1<f32>> {
        estimator.compute_grad(self.model.as_ref(), &mut self.store, seed, x, y, loss_fn)
    }

    /// Makes the optimizer take a step with the gradient currently in the buffer.
    pub fn step(&mut self) -> Result<()> {
        self.store.step(self.optimizer.as_mut())
    }

    /// Applies a seeded history of estimations, one optimizer step per seed.
    pub fn replay(
        &mut self,
        estimator: &RandomGradientEstimator,
        seeds: &[u64],
        dir_grads: &[Array1<f32>],
    ) -> Result<()> {
        update_model_given_seeds(
            &mut self.store,
            self.optimizer.as_mut(),
            estimator,
            seeds,
            dir_grads,
        )
    }

    /// Computes the average loss and accuracy over `dataset` without modifying anything.
    ///
    /// # Returns
    /// `(loss, accuracy)` averaged over the batches.
    pub fn evaluate(
        &self,
        dataset: &Dataset,
        batch_size: NonZeroUsize,
        loss_fn: &dyn LossFn,
    ) -> Result<(f32, f32)> {
        let mut loss = Metric::new("eval loss");
        let mut acc = Metric::new("eval accuracy");

        for (x, y) in dataset.batches(batch_size) {
            let y_pred = self.forward(x)?;
            loss.update(loss_fn.loss(y_pred.view(), y));
            acc.update(accuracy(y_pred.view(), y));
        }

        Ok((loss.avg(), acc.avg()))
    }
}
