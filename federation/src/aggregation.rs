use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::{FederationErr, Result};

/// How the scalars the sampled clients report for the same seed are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// The plain average across clients.
    #[default]
    Mean,
    /// The sum across clients.
    Sum,
    /// The average weighted by the amount of local samples of every client.
    WeightedByDataLen,
}

impl Aggregation {
    /// Combines the scalars of every sampled client, seed by seed.
    ///
    /// # Arguments
    /// * `per_client` - For each client, one scalar group per local step.
    /// * `data_lens` - The amount of local samples of each client, used for weighting.
    ///
    /// # Returns
    /// One aggregated scalar group per local step, or an error if the clients disagree on
    /// the amount of steps or perturbations.
    pub fn aggregate(
        &self,
        per_client: &[Vec<Array1<f32>>],
        data_lens: &[usize],
    ) -> Result<Vec<Array1<f32>>> {
        let Some(first) = per_client.first() else {
            return Err(FederationErr::Config("no client results to aggregate".into()));
        };

        if data_lens.len() != per_client.len() {
            return Err(FederationErr::Config(format!(
                "got {} data lengths for {} clients",
                data_lens.len(),
                per_client.len()
            )));
        }

        for (i, groups) in per_client.iter().enumerate() {
            let matches = groups.len() == first.len()
                && groups.iter().zip(first).all(|(g, f)| g.len() == f.len());

            if !matches {
                return Err(FederationErr::Config(format!(
                    "client result {i} doesn't match the shape of the others"
                )));
            }
        }

        let weights = self.weights(data_lens)?;
        let aggregated = (0..first.len())
            .map(|step| {
                let mut acc = Array1::zeros(first[step].len());
                for (groups, &w) in per_client.iter().zip(&weights) {
                    acc.scaled_add(w, &groups[step]);
                }
                acc
            })
            .collect();

        Ok(aggregated)
    }

    fn weights(&self, data_lens: &[usize]) -> Result<Vec<f32>> {
        let n = data_lens.len();
        let weights = match self {
            Aggregation::Mean => vec![1. / n as f32; n],
            Aggregation::Sum => vec![1.; n],
            Aggregation::WeightedByDataLen => {
                let total: usize = data_lens.iter().sum();
                if total == 0 {
                    return Err(FederationErr::Config(
                        "can't weight by data length, every client is empty".into(),
                    ));
                }

                data_lens
                    .iter()
                    .map(|&len| len as f32 / total as f32)
                    .collect()
            }
        };

        Ok(weights)
    }
}
