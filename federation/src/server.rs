use std::num::NonZeroUsize;

use log::{debug, info, warn};
use machine_learning::{
    arch::loss::LossFn, dataset::Dataset, estimation::RandomGradientEstimator, training::Replica,
};
use ndarray::Array1;
use rand::{Rng, SeedableRng, rngs::StdRng, seq::index};
use serde::{Deserialize, Serialize};

use crate::{Aggregation, FederatedClient, FederationErr, Result, SeedGradRecords};

/// When clients catch up with the rounds they didn't take part in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
    /// Every client replays every round as soon as it ends.
    #[default]
    Eager,
    /// A client replays the rounds it missed only right before its next local update, or on
    /// an explicit `sync_all_clients`.
    Lazy,
}

/// What happened during one round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub iteration: usize,
    pub sampled: Vec<usize>,
    pub seeds: Vec<u64>,
    pub dir_grads: Vec<Array1<f32>>,
}

/// The CeZO server: owns the canonical model and drives the rounds of the federation.
///
/// No gradient ever travels between the server and its clients, only seeds and the scalars
/// estimated along the directions those seeds generate.
pub struct CezoServer<C: FederatedClient> {
    replica: Replica,
    estimator: RandomGradientEstimator,
    loss_fn: Box<dyn LossFn>,
    clients: Vec<C>,
    synced_rounds: Vec<usize>,
    records: SeedGradRecords,
    num_sample_clients: NonZeroUsize,
    local_update_steps: NonZeroUsize,
    aggregation: Aggregation,
    sync_policy: SyncPolicy,
    rng: StdRng,
    last_iteration: Option<usize>,
}

impl<C: FederatedClient> CezoServer<C> {
    /// Creates a new `CezoServer`.
    ///
    /// Every client must start from the same parameters as `replica`.
    ///
    /// # Arguments
    /// * `replica` - The canonical model.
    /// * `estimator` - The estimator every participant is configured with.
    /// * `loss_fn` - The loss used for evaluation.
    /// * `clients` - The participants of the federation.
    /// * `num_sample_clients` - How many distinct clients take part in each round.
    /// * `local_update_steps` - How many seeds, and local steps, each round has.
    /// * `seed` - Drives client sampling and seed generation.
    ///
    /// # Returns
    /// A new server or a configuration error if the counts don't make sense.
    pub fn new(
        replica: Replica,
        estimator: RandomGradientEstimator,
        loss_fn: Box<dyn LossFn>,
        clients: Vec<C>,
        num_sample_clients: usize,
        local_update_steps: usize,
        seed: u64,
    ) -> Result<Self> {
        if clients.is_empty() {
            return Err(FederationErr::Config("a federation needs clients".into()));
        }

        let num_sample_clients = NonZeroUsize::new(num_sample_clients)
            .filter(|k| k.get() <= clients.len())
            .ok_or_else(|| {
                FederationErr::Config(format!(
                    "can't sample {num_sample_clients} out of {} clients",
                    clients.len()
                ))
            })?;

        let local_update_steps = NonZeroUsize::new(local_update_steps).ok_or_else(|| {
            FederationErr::Config("a round needs at least one local update step".into())
        })?;

        Ok(Self {
            replica,
            estimator,
            loss_fn,
            synced_rounds: vec![0; clients.len()],
            clients,
            records: SeedGradRecords::new(),
            num_sample_clients,
            local_update_steps,
            aggregation: Aggregation::default(),
            sync_policy: SyncPolicy::default(),
            rng: StdRng::seed_from_u64(seed),
            last_iteration: None,
        })
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_sync_policy(mut self, sync_policy: SyncPolicy) -> Self {
        self.sync_policy = sync_policy;
        self
    }

    pub fn replica(&self) -> &Replica {
        &self.replica
    }

    pub fn clients(&self) -> &[C] {
        &self.clients
    }

    pub fn records(&self) -> &SeedGradRecords {
        &self.records
    }

    /// Returns the amount of rounds the canonical model has gone through.
    pub fn rounds(&self) -> usize {
        self.records.next_round()
    }

    /// Runs one round of the federation.
    ///
    /// Sampled clients train locally on the same fresh seeds, their scalars are aggregated
    /// seed by seed and replayed on the canonical model. Sampled clients then drop their
    /// local steps and, under `SyncPolicy::Eager`, every client replays the round.
    ///
    /// # Arguments
    /// * `iteration` - The caller's round counter, must be strictly increasing.
    ///
    /// # Returns
    /// The report of the round or the first error any participant ran into. A failed round
    /// leaves every sampled client back on its checkpoint and records nothing.
    pub fn train_one_step(&mut self, iteration: usize) -> Result<RoundReport> {
        if let Some(last) = self.last_iteration.filter(|&last| iteration <= last) {
            return Err(FederationErr::OutOfOrderRound {
                got: iteration,
                last,
            });
        }

        let mut sampled = index::sample(
            &mut self.rng,
            self.clients.len(),
            self.num_sample_clients.get(),
        )
        .into_vec();
        sampled.sort_unstable();

        let seeds: Vec<u64> = (0..self.local_update_steps.get())
            .map(|_| self.rng.random())
            .collect();

        let dir_grads = match self.aggregated_updates(iteration, &sampled, &seeds) {
            Ok(dir_grads) => dir_grads,
            Err(err) => {
                self.abort_round(iteration, &sampled);
                return Err(err);
            }
        };

        for &i in &sampled {
            self.clients[i].reset_model()?;
        }

        self.replica.replay(&self.estimator, &seeds, &dir_grads)?;
        self.records.push(seeds.clone(), dir_grads.clone());
        self.last_iteration = Some(iteration);

        if self.sync_policy == SyncPolicy::Eager {
            self.sync_all_clients()?;
        } else {
            self.prune_records();
        }

        info!(
            iteration = iteration,
            round = self.rounds(),
            sampled = sampled.len();
            "round done"
        );

        Ok(RoundReport {
            iteration,
            sampled,
            seeds,
            dir_grads,
        })
    }

    /// Brings every client up to date with the canonical model.
    pub fn sync_all_clients(&mut self) -> Result<()> {
        for i in 0..self.clients.len() {
            self.sync_client(i)?;
        }

        self.prune_records();
        Ok(())
    }

    /// Evaluates the canonical model on held-out data.
    ///
    /// # Returns
    /// The average loss and accuracy over `dataset`.
    pub fn eval_model(&self, dataset: &Dataset, batch_size: NonZeroUsize) -> Result<(f32, f32)> {
        Ok(self
            .replica
            .evaluate(dataset, batch_size, self.loss_fn.as_ref())?)
    }

    /// Runs the local updates of the sampled clients and aggregates their scalars.
    fn aggregated_updates(
        &mut self,
        iteration: usize,
        sampled: &[usize],
        seeds: &[u64],
    ) -> Result<Vec<Array1<f32>>> {
        let mut results = Vec::with_capacity(sampled.len());
        let mut data_lens = Vec::with_capacity(sampled.len());

        for &i in sampled {
            if self.sync_policy == SyncPolicy::Lazy {
                self.sync_client(i)?;
            }

            let client = &mut self.clients[i];
            results.push(client.local_update(seeds)?);
            data_lens.push(client.data_len());
        }

        if results.iter().all(Vec::is_empty) {
            warn!(iteration = iteration; "sampled clients returned no results");
        }

        self.aggregation.aggregate(&results, &data_lens)
    }

    /// Puts every sampled client back on its checkpoint after a failed round, so no local
    /// step leaks into the next one.
    fn abort_round(&mut self, iteration: usize, sampled: &[usize]) {
        for &i in sampled {
            if let Err(err) = self.clients[i].reset_model() {
                warn!(iteration = iteration, client_id = i; "reset after failed round: {err}");
            }
        }
    }

    fn sync_client(&mut self, i: usize) -> Result<()> {
        let synced = self.synced_rounds[i];
        if synced == self.records.next_round() {
            return Ok(());
        }

        let (seeds_list, dir_grads_list) = self.records.since(synced).ok_or_else(|| {
            FederationErr::Config(format!(
                "client {i} is at round {synced}, history starts at {}",
                self.records.first_round()
            ))
        })?;

        self.clients[i].pull_model(seeds_list, dir_grads_list)?;
        self.synced_rounds[i] = self.records.next_round();
        debug!(client_id = i, from = synced, to = self.synced_rounds[i]; "client synced");
        Ok(())
    }

    fn prune_records(&mut self) {
        let oldest = self
            .synced_rounds
            .iter()
            .copied()
            .min()
            .unwrap_or_else(|| self.records.next_round());

        let dropped = self.records.prune_before(oldest);
        if dropped > 0 {
            debug!(dropped = dropped, first_round = self.records.first_round(); "pruned history");
        }
    }
}
