use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{Aggregation, FederationErr, Result, SyncPolicy};

/// Whether the model is trained by a federation or by a single trainer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Federated,
    Centralized,
}

/// The architecture, selected by tag from the model registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub tag: String,
    #[serde(default)]
    pub hidden: Vec<usize>,
    #[serde(default)]
    pub init: InitConfig,
}

/// The initialisation scheme for weights. Biases always start at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitConfig {
    #[default]
    XavierUniform,
    Kaiming,
    Normal {
        mean: f32,
        std_dev: f32,
    },
    Uniform {
        low: f32,
        high: f32,
    },
    Const {
        value: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_mu")]
    pub mu: f32,
    #[serde(default = "default_num_pert")]
    pub num_pert: usize,
    #[serde(default)]
    pub normalize: bool,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            mu: default_mu(),
            num_pert: default_num_pert(),
            normalize: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetConfig {
    Csv {
        path: PathBuf,
        x_size: usize,
        y_size: usize,
    },
    Inline {
        data: Vec<f32>,
        x_size: usize,
        y_size: usize,
    },
    Blobs {
        classes: usize,
        features: usize,
        samples_per_class: usize,
        spread: f32,
    },
}

/// How the training data is spread across clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSplit {
    /// Every client trains on the whole training set.
    Full,
    /// Every client gets a balanced, disjoint shard of the shuffled training set.
    #[default]
    Shards,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossConfig {
    Mse,
    CrossEntropy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerConfig {
    GradientDescent {
        lr: f32,
        #[serde(default)]
        weight_decay: f32,
    },
    GradientDescentWithMomentum {
        lr: f32,
        momentum: f32,
        #[serde(default)]
        weight_decay: f32,
    },
    Adam {
        lr: f32,
        b1: f32,
        b2: f32,
        eps: f32,
    },
}

/// Everything needed to run a simulation, loaded from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CezoConfig {
    #[serde(default)]
    pub mode: Mode,
    pub model: ModelConfig,
    #[serde(default)]
    pub estimator: EstimatorConfig,
    pub dataset: DatasetConfig,
    #[serde(default = "default_test_ratio")]
    pub test_ratio: f32,
    #[serde(default)]
    pub split: DataSplit,
    pub loss: LossConfig,
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub sync: SyncPolicy,
    #[serde(default = "default_one")]
    pub clients: usize,
    #[serde(default = "default_one")]
    pub num_sample_clients: usize,
    #[serde(default = "default_one")]
    pub local_update_steps: usize,
    pub iterations: usize,
    #[serde(default = "default_eval_interval")]
    pub eval_interval: usize,
    #[serde(default = "default_batch_size")]
    pub train_batch_size: usize,
    #[serde(default = "default_batch_size")]
    pub test_batch_size: usize,
    #[serde(default)]
    pub seed: u64,
}

impl CezoConfig {
    /// Reads and validates a configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that can't describe a runnable simulation.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(FederationErr::Config(msg));

        if self.clients == 0 {
            return invalid("at least one client is required".into());
        }

        if self.num_sample_clients == 0 || self.num_sample_clients > self.clients {
            return invalid(format!(
                "num_sample_clients ({}) must be between 1 and the number of clients ({})",
                self.num_sample_clients, self.clients
            ));
        }

        if self.local_update_steps == 0 {
            return invalid("local_update_steps must be greater than 0".into());
        }

        if self.eval_interval == 0 {
            return invalid("eval_interval must be greater than 0".into());
        }

        if self.train_batch_size == 0 || self.test_batch_size == 0 {
            return invalid("batch sizes must be greater than 0".into());
        }

        if !(0. ..1.).contains(&self.test_ratio) {
            return invalid(format!(
                "test_ratio must be in [0, 1), got {}",
                self.test_ratio
            ));
        }

        if let DatasetConfig::Inline { data, x_size, y_size } = &self.dataset {
            let row = x_size + y_size;
            if row == 0 || data.len() % row != 0 {
                return invalid(format!(
                    "inline dataset length ({}) is not divisible by x_size + y_size ({row})",
                    data.len()
                ));
            }
        }

        Ok(())
    }
}

fn default_method() -> String {
    "rge-central".into()
}

fn default_mu() -> f32 {
    1e-3
}

fn default_num_pert() -> usize {
    1
}

fn default_test_ratio() -> f32 {
    0.2
}

fn default_one() -> usize {
    1
}

fn default_eval_interval() -> usize {
    20
}

fn default_batch_size() -> usize {
    32
}
