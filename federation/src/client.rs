use log::debug;
use machine_learning::{
    MlErr,
    arch::loss::LossFn,
    dataset::CyclicLoader,
    estimation::RandomGradientEstimator,
    training::{Checkpoint, Replica},
};
use ndarray::Array1;

use crate::Result;

/// Where a client's replica stands relative to its last checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// The replica equals the last checkpoint.
    Synced,
    /// The replica took local steps since the last checkpoint.
    DivergedLocal,
}

/// The operations a server needs from every participant of a federation.
pub trait FederatedClient {
    /// Takes one local step per seed, all of them with the same seed-derived perturbations
    /// the server will later replay.
    ///
    /// # Returns
    /// The per-direction scalars of every step, one entry per seed.
    fn local_update(&mut self, seeds: &[u64]) -> Result<Vec<Array1<f32>>>;

    /// Throws away every local step since the last checkpoint.
    fn reset_model(&mut self) -> Result<()>;

    /// Resets to the last checkpoint and replays the given rounds in order.
    ///
    /// # Arguments
    /// * `seeds_list` - The seeds of every round.
    /// * `dir_grads_list` - The aggregated scalars of every round, matching `seeds_list`.
    fn pull_model(
        &mut self,
        seeds_list: &[Vec<u64>],
        dir_grads_list: &[Vec<Array1<f32>>],
    ) -> Result<()>;

    /// Returns the amount of local training samples.
    fn data_len(&self) -> usize;
}

impl<C: FederatedClient + ?Sized> FederatedClient for Box<C> {
    fn local_update(&mut self, seeds: &[u64]) -> Result<Vec<Array1<f32>>> {
        (**self).local_update(seeds)
    }

    fn reset_model(&mut self) -> Result<()> {
        (**self).reset_model()
    }

    fn pull_model(
        &mut self,
        seeds_list: &[Vec<u64>],
        dir_grads_list: &[Vec<Array1<f32>>],
    ) -> Result<()> {
        (**self).pull_model(seeds_list, dir_grads_list)
    }

    fn data_len(&self) -> usize {
        (**self).data_len()
    }
}

/// A federation participant training on its own local data.
pub struct Client {
    id: usize,
    replica: Replica,
    estimator: RandomGradientEstimator,
    loss_fn: Box<dyn LossFn>,
    loader: CyclicLoader,
    checkpoint: Checkpoint,
    state: ClientState,
}

impl Client {
    /// Creates a new `Client`, checkpointing its initial replica as round 0.
    ///
    /// # Arguments
    /// * `id` - The index of the client in the federation.
    /// * `replica` - The client's own copy of the model.
    /// * `estimator` - The gradient estimator, shared configuration across the federation.
    /// * `loss_fn` - The loss minimized locally.
    /// * `loader` - An endless loader over the local data.
    pub fn new(
        id: usize,
        replica: Replica,
        estimator: RandomGradientEstimator,
        loss_fn: Box<dyn LossFn>,
        loader: CyclicLoader,
    ) -> Self {
        let checkpoint = replica.checkpoint(0);

        Self {
            id,
            replica,
            estimator,
            loss_fn,
            loader,
            checkpoint,
            state: ClientState::Synced,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn replica(&self) -> &Replica {
        &self.replica
    }

    pub fn params(&self) -> &[f32] {
        self.replica.params()
    }

    /// Returns the last checkpoint, which records how many rounds the client has replayed.
    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }
}

impl FederatedClient for Client {
    fn local_update(&mut self, seeds: &[u64]) -> Result<Vec<Array1<f32>>> {
        if self.state == ClientState::DivergedLocal {
            self.reset_model()?;
        }

        let mut dir_grads = Vec::with_capacity(seeds.len());

        for &seed in seeds {
            let (x, y) = self.loader.next_batch();
            let scalars = self.replica.estimate_grad(
                &self.estimator,
                seed,
                x.view(),
                y.view(),
                self.loss_fn.as_ref(),
            )?;
            self.replica.step()?;
            dir_grads.push(scalars);
        }

        self.state = ClientState::DivergedLocal;
        debug!(client_id = self.id, steps = seeds.len(); "local update done");
        Ok(dir_grads)
    }

    fn reset_model(&mut self) -> Result<()> {
        self.replica.restore(&self.checkpoint)?;
        self.state = ClientState::Synced;
        Ok(())
    }

    fn pull_model(
        &mut self,
        seeds_list: &[Vec<u64>],
        dir_grads_list: &[Vec<Array1<f32>>],
    ) -> Result<()> {
        if seeds_list.len() != dir_grads_list.len() {
            return Err(MlErr::SizeMismatch {
                what: "rounds of gradient scalars",
                got: dir_grads_list.len(),
                expected: seeds_list.len(),
            }
            .into());
        }

        self.reset_model()?;
        for (seeds, dir_grads) in seeds_list.iter().zip(dir_grads_list) {
            self.replica.replay(&self.estimator, seeds, dir_grads)?;
        }

        let round = self.checkpoint.round() + seeds_list.len();
        self.checkpoint = self.replica.checkpoint(round);
        debug!(client_id = self.id, rounds = seeds_list.len(), round = round; "pulled model");
        Ok(())
    }

    fn data_len(&self) -> usize {
        self.loader.dataset().len()
    }
}
