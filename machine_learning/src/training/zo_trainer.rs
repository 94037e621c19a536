use std::num::NonZeroUsize;

use log::{debug, info};
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::Replica;
use crate::{
    Result,
    arch::loss::LossFn,
    dataset::Dataset,
    estimation::RandomGradientEstimator,
    metrics::{Metric, accuracy},
};

/// Trains a single model with zeroth-order gradient estimates, no federation involved.
pub struct ZoTrainer {
    replica: Replica,
    estimator: RandomGradientEstimator,
    loss_fn: Box<dyn LossFn>,
    dataset: Dataset,
    batch_size: NonZeroUsize,
    rng: StdRng,
    epoch: usize,
}

impl ZoTrainer {
    /// Creates a new `ZoTrainer`.
    ///
    /// # Arguments
    /// * `replica` - The model to train.
    /// * `estimator` - The gradient estimator.
    /// * `loss_fn` - The loss being minimized.
    /// * `dataset` - The training data.
    /// * `batch_size` - The amount of samples per step.
    /// * `seed` - Drives both the shuffling and the perturbation seeds.
    pub fn new(
        replica: Replica,
        estimator: RandomGradientEstimator,
        loss_fn: Box<dyn LossFn>,
        dataset: Dataset,
        batch_size: NonZeroUsize,
        seed: u64,
    ) -> Self {
        Self {
            replica,
            estimator,
            loss_fn,
            dataset,
            batch_size,
            rng: StdRng::seed_from_u64(seed),
            epoch: 0,
        }
    }

    pub fn replica(&self) -> &Replica {
        &self.replica
    }

    /// Runs one pass over the shuffled training data, one estimate and step per batch.
    ///
    /// # Returns
    /// The average training loss and accuracy, measured right after every step.
    pub fn train_epoch(&mut self) -> Result<(f32, f32)> {
        let mut loss = Metric::new("train loss");
        let mut acc = Metric::new("train accuracy");

        self.dataset.shuffle(&mut self.rng);
        for (x, y) in self.dataset.batches(self.batch_size) {
            let seed = self.rng.random::<u64>();
            self.replica
                .estimate_grad(&self.estimator, seed, x, y, self.loss_fn.as_ref())?;
            self.replica.step()?;

            let y_pred = self.replica.forward(x)?;
            loss.update(self.loss_fn.loss(y_pred.view(), y));
            acc.update(accuracy(y_pred.view(), y));
        }

        debug!(epoch = self.epoch; "finished training epoch");
        self.epoch += 1;
        Ok((loss.avg(), acc.avg()))
    }

    /// Evaluates the model on held-out data.
    pub fn eval(&self, dataset: &Dataset, batch_size: NonZeroUsize) -> Result<(f32, f32)> {
        self.replica.evaluate(dataset, batch_size, self.loss_fn.as_ref())
    }

    /// Trains for `epochs` epochs, evaluating on `test` after each one.
    ///
    /// # Returns
    /// The `(loss, accuracy)` of the last evaluation.
    pub fn fit(
        &mut self,
        epochs: usize,
        test: &Dataset,
        batch_size: NonZeroUsize,
    ) -> Result<(f32, f32)> {
        let mut last = (0., 0.);
        for _ in 0..epochs {
            let (train_loss, train_acc) = self.train_epoch()?;
            let (eval_loss, eval_acc) = self.eval(test, batch_size)?;

            info!(
                epoch = self.epoch,
                train_loss = train_loss,
                train_accuracy = train_acc,
                eval_loss = eval_loss,
                eval_accuracy = eval_acc;
                "epoch done"
            );
            last = (eval_loss, eval_acc);
        }

        Ok(last)
    }
}
