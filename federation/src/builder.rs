use std::{collections::HashMap, fs, num::NonZeroUsize};

use log::debug;
use machine_learning::{
    arch::{
        Model, Sequential,
        activations::ActFn,
        layers::Layer,
        loss::{CrossEntropy, LossFn, Mse},
    },
    dataset::{CyclicLoader, Dataset, gaussian_blobs, parse_csv},
    estimation::{DifferenceMethod, RandomGradientEstimator},
    initialization::{Init, ParamGen},
    optimization::{Adam, GradientDescent, GradientDescentWithMomentum, Optimizer},
    params::ParamStore,
    training::{Replica, ZoTrainer},
};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    CezoServer, Client, FederationErr, Result,
    config::{
        CezoConfig, DataSplit, DatasetConfig, EstimatorConfig, InitConfig, LossConfig,
        ModelConfig, OptimizerConfig,
    },
};

/// The input and output sizes a model has to fit, plus the hidden widths asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelShape {
    pub inputs: usize,
    pub outputs: usize,
    pub hidden: Vec<usize>,
}

/// Builds a model for the given shape.
pub type ModelFactory = Box<dyn Fn(&ModelShape) -> Result<Box<dyn Model>>>;

/// Maps configuration tags to model constructors.
pub struct ModelRegistry {
    factories: HashMap<String, ModelFactory>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register("linear", |shape| {
            Ok(Box::new(Sequential::new([Layer::dense(
                (shape.inputs, shape.outputs),
                None,
            )])))
        });
        registry.register("logistic", |shape| {
            Ok(Box::new(Sequential::new([Layer::dense(
                (shape.inputs, shape.outputs),
                Some(ActFn::sigmoid(1.)),
            )])))
        });
        registry.register("mlp", |shape| mlp(shape, ActFn::relu()));
        registry.register("mlp_tanh", |shape| mlp(shape, ActFn::tanh()));
        registry
    }
}

impl ModelRegistry {
    /// Creates an empty registry, see `ModelRegistry::default` for one with the built-in
    /// models.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers `factory` under `tag`, replacing any previous one.
    pub fn register<F>(&mut self, tag: impl Into<String>, factory: F)
    where
        F: Fn(&ModelShape) -> Result<Box<dyn Model>> + 'static,
    {
        self.factories.insert(tag.into(), Box::new(factory));
    }

    /// Returns the registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<_> = self.factories.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Builds the model registered under `tag`.
    ///
    /// # Returns
    /// The model or a configuration error if the tag is unknown.
    pub fn build(&self, tag: &str, shape: &ModelShape) -> Result<Box<dyn Model>> {
        let factory = self.factories.get(tag).ok_or_else(|| {
            FederationErr::Config(format!(
                "unknown model {tag}, expected one of {:?}",
                self.tags()
            ))
        })?;

        factory(shape)
    }
}

fn mlp(shape: &ModelShape, act_fn: ActFn) -> Result<Box<dyn Model>> {
    if shape.hidden.is_empty() {
        return Err(FederationErr::Config(
            "an mlp needs at least one hidden layer".into(),
        ));
    }

    let widths: Vec<_> = std::iter::once(shape.inputs)
        .chain(shape.hidden.iter().copied())
        .chain(std::iter::once(shape.outputs))
        .collect();

    let last = widths.len() - 2;
    let layers = widths.windows(2).enumerate().map(|(i, dim)| {
        let act_fn = (i < last).then_some(act_fn);
        Layer::dense((dim[0], dim[1]), act_fn)
    });

    Ok(Box::new(Sequential::new(layers)))
}

/// Resolves a `CezoConfig` into live models, clients, servers and trainers.
///
/// Every replica it builds starts from the same parameters and optimizer state.
pub struct SimulationBuilder<'a> {
    config: &'a CezoConfig,
    registry: ModelRegistry,
}

impl<'a> SimulationBuilder<'a> {
    /// Creates a builder that resolves models through the default registry.
    pub fn new(config: &'a CezoConfig) -> Self {
        Self::with_registry(config, ModelRegistry::default())
    }

    pub fn with_registry(config: &'a CezoConfig, registry: ModelRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &'a CezoConfig {
        self.config
    }

    /// Loads the dataset, shuffles it with the configured seed and splits it into train and
    /// test sets.
    ///
    /// With a zero `test_ratio` the whole dataset is used for both.
    pub fn build_datasets(&self) -> Result<(Dataset, Dataset)> {
        let mut dataset = self.resolve_dataset(&self.config.dataset)?;
        dataset.shuffle(&mut StdRng::seed_from_u64(self.config.seed));

        if self.config.test_ratio == 0. {
            return Ok((dataset.clone(), dataset));
        }

        Ok(dataset.split(1. - self.config.test_ratio)?)
    }

    /// Builds the estimator every participant shares.
    pub fn build_estimator(&self) -> Result<RandomGradientEstimator> {
        self.resolve_estimator(&self.config.estimator)
    }

    pub fn build_loss(&self) -> Box<dyn LossFn> {
        match self.config.loss {
            LossConfig::Mse => Box::new(Mse::new()),
            LossConfig::CrossEntropy => Box::new(CrossEntropy::new()),
        }
    }

    /// Builds a replica sized for the given dataset, initialised from the configured seed.
    pub fn build_replica(&self, dataset: &Dataset) -> Result<Replica> {
        let model = self.resolve_model(&self.config.model, dataset)?;
        let init = self.resolve_init(self.config.model.init);
        let mut param_gen = ParamGen::new(self.config.seed, init, Init::Const { value: 0. });

        let store = ParamStore::for_model(&model, &mut param_gen)?;
        let optimizer = self.resolve_optimizer(self.config.optimizer, store.len());
        Ok(Replica::new(model, store, optimizer)?)
    }

    /// Builds every client, each one with its own part of `train` and its own loader rng.
    pub fn build_clients(&self, train: &Dataset) -> Result<Vec<Client>> {
        let n = self.client_count()?;
        let batch_size = self.batch_size(self.config.train_batch_size)?;

        (0..n.get())
            .map(|i| -> Result<Client> {
                let local = match self.config.split {
                    DataSplit::Full => train.clone(),
                    DataSplit::Shards => train.shard(i, n)?,
                };

                let loader_seed = self.config.seed.wrapping_add(i as u64 + 1);
                let loader = CyclicLoader::shuffled(local, batch_size, loader_seed);
                debug!(client_id = i, samples = loader.dataset().len(); "built client");

                Ok(Client::new(
                    i,
                    self.build_replica(train)?,
                    self.build_estimator()?,
                    self.build_loss(),
                    loader,
                ))
            })
            .collect()
    }

    /// Builds the server along with all of its clients.
    pub fn build_server(&self, train: &Dataset) -> Result<CezoServer<Client>> {
        let server = CezoServer::new(
            self.build_replica(train)?,
            self.build_estimator()?,
            self.build_loss(),
            self.build_clients(train)?,
            self.config.num_sample_clients,
            self.config.local_update_steps,
            self.config.seed,
        )?;

        Ok(server
            .with_aggregation(self.config.aggregation)
            .with_sync_policy(self.config.sync))
    }

    /// Builds a single-model trainer over the whole of `train`.
    pub fn build_trainer(&self, train: Dataset) -> Result<ZoTrainer> {
        let batch_size = self.batch_size(self.config.train_batch_size)?;

        Ok(ZoTrainer::new(
            self.build_replica(&train)?,
            self.build_estimator()?,
            self.build_loss(),
            train,
            batch_size,
            self.config.seed,
        ))
    }

    pub fn test_batch_size(&self) -> Result<NonZeroUsize> {
        self.batch_size(self.config.test_batch_size)
    }

    fn client_count(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.config.clients)
            .ok_or_else(|| FederationErr::Config("at least one client is required".into()))
    }

    fn batch_size(&self, size: usize) -> Result<NonZeroUsize> {
        NonZeroUsize::new(size)
            .ok_or_else(|| FederationErr::Config("batch sizes must be greater than 0".into()))
    }

    fn resolve_model(&self, config: &ModelConfig, dataset: &Dataset) -> Result<Box<dyn Model>> {
        let shape = ModelShape {
            inputs: dataset.x_size(),
            outputs: dataset.y_size(),
            hidden: config.hidden.clone(),
        };

        self.registry.build(&config.tag, &shape)
    }

    fn resolve_init(&self, init: InitConfig) -> Init {
        match init {
            InitConfig::XavierUniform => Init::XavierUniform,
            InitConfig::Kaiming => Init::Kaiming,
            InitConfig::Normal { mean, std_dev } => Init::Normal { mean, std_dev },
            InitConfig::Uniform { low, high } => Init::Uniform { low, high },
            InitConfig::Const { value } => Init::Const { value },
        }
    }

    fn resolve_estimator(&self, config: &EstimatorConfig) -> Result<RandomGradientEstimator> {
        let method: DifferenceMethod = config.method.parse()?;
        let estimator = RandomGradientEstimator::new(config.mu, config.num_pert, method)?;

        if config.normalize {
            return Ok(estimator.with_normalized_perturbations());
        }

        Ok(estimator)
    }

    fn resolve_optimizer(&self, config: OptimizerConfig, len: usize) -> Box<dyn Optimizer> {
        match config {
            OptimizerConfig::GradientDescent { lr, weight_decay } => {
                Box::new(GradientDescent::new(lr).with_weight_decay(weight_decay))
            }
            OptimizerConfig::GradientDescentWithMomentum {
                lr,
                momentum,
                weight_decay,
            } => Box::new(
                GradientDescentWithMomentum::new(len, lr, momentum).with_weight_decay(weight_decay),
            ),
            OptimizerConfig::Adam { lr, b1, b2, eps } => Box::new(Adam::new(len, lr, b1, b2, eps)),
        }
    }

    fn resolve_dataset(&self, config: &DatasetConfig) -> Result<Dataset> {
        let dataset = match config {
            DatasetConfig::Csv {
                path,
                x_size,
                y_size,
            } => {
                let text = fs::read_to_string(path)?;
                parse_csv(&text, *x_size, *y_size)?
            }
            DatasetConfig::Inline {
                data,
                x_size,
                y_size,
            } => Dataset::new(data.clone(), *x_size, *y_size)?,
            DatasetConfig::Blobs {
                classes,
                features,
                samples_per_class,
                spread,
            } => gaussian_blobs(
                *classes,
                *features,
                *samples_per_class,
                *spread,
                self.config.seed,
            )?,
        };

        Ok(dataset)
    }
}
