use std::num::NonZeroUsize;

use log::info;
use machine_learning::{dataset::Dataset, training::ZoTrainer};

use crate::{
    CezoServer, Client, Result, SimulationBuilder,
    config::{CezoConfig, Mode},
};

/// The loss and accuracy of the model on the test set after a given iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub iteration: usize,
    pub loss: f32,
    pub accuracy: f32,
}

enum Runner {
    Federated(CezoServer<Client>),
    Centralized(ZoTrainer),
}

/// Runs a whole experiment described by a `CezoConfig`.
///
/// In federated mode an iteration is a round of the server, in centralized mode it's an
/// epoch of a single trainer.
pub struct Simulation {
    runner: Runner,
    test: Dataset,
    iterations: usize,
    eval_interval: usize,
    test_batch_size: NonZeroUsize,
}

impl Simulation {
    /// Builds every participant with the default model registry.
    pub fn from_config(config: &CezoConfig) -> Result<Self> {
        Self::with_builder(SimulationBuilder::new(config))
    }

    /// Builds every participant with a custom builder, from the configuration it resolves.
    pub fn with_builder(builder: SimulationBuilder<'_>) -> Result<Self> {
        let config = builder.config();
        config.validate()?;
        let (train, test) = builder.build_datasets()?;

        let runner = match config.mode {
            Mode::Federated => Runner::Federated(builder.build_server(&train)?),
            Mode::Centralized => Runner::Centralized(builder.build_trainer(train)?),
        };

        info!(
            iterations = config.iterations,
            test_samples = test.len();
            "{:?} simulation ready",
            config.mode
        );

        Ok(Self {
            runner,
            test,
            iterations: config.iterations,
            eval_interval: config.eval_interval,
            test_batch_size: builder.test_batch_size()?,
        })
    }

    /// Returns the server, if the simulation is federated.
    pub fn server(&self) -> Option<&CezoServer<Client>> {
        match &self.runner {
            Runner::Federated(server) => Some(server),
            Runner::Centralized(_) => None,
        }
    }

    /// Evaluates the current model on the test set.
    pub fn evaluate(&self) -> Result<(f32, f32)> {
        match &self.runner {
            Runner::Federated(server) => server.eval_model(&self.test, self.test_batch_size),
            Runner::Centralized(trainer) => Ok(trainer.eval(&self.test, self.test_batch_size)?),
        }
    }

    /// Runs every iteration, evaluating every `eval_interval` iterations and after the last.
    ///
    /// # Returns
    /// Every evaluation made, in order.
    pub fn run(&mut self) -> Result<Vec<Evaluation>> {
        let mut evaluations = Vec::new();

        for iteration in 0..self.iterations {
            match &mut self.runner {
                Runner::Federated(server) => {
                    server.train_one_step(iteration)?;
                }
                Runner::Centralized(trainer) => {
                    let (loss, accuracy) = trainer.train_epoch()?;
                    info!(epoch = iteration, loss = loss, accuracy = accuracy; "train");
                }
            }

            let done = iteration + 1;
            if done % self.eval_interval == 0 || done == self.iterations {
                let (loss, accuracy) = self.evaluate()?;
                info!(iteration = done, loss = loss, accuracy = accuracy; "evaluation");

                evaluations.push(Evaluation {
                    iteration: done,
                    loss,
                    accuracy,
                });
            }
        }

        Ok(evaluations)
    }
}
