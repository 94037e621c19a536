use std::num::NonZeroUsize;

use ndarray::{Array2, s};
use rand::{SeedableRng, rngs::StdRng};

use super::Dataset;

/// An endless loader that cycles through a dataset in batches.
///
/// Whenever the dataset is exhausted the loader starts over, reshuffling it first if so
/// configured. The shuffling rng belongs to the loader, so drawing batches never touches
/// any other source of randomness.
#[derive(Debug, Clone)]
pub struct CyclicLoader {
    dataset: Dataset,
    batch_size: NonZeroUsize,
    cursor: usize,
    shuffle: Option<StdRng>,
}

impl CyclicLoader {
    /// Creates a new `CyclicLoader` that walks `dataset` in order.
    pub fn new(dataset: Dataset, batch_size: NonZeroUsize) -> Self {
        Self {
            dataset,
            batch_size,
            cursor: 0,
            shuffle: None,
        }
    }

    /// Creates a new `CyclicLoader` that reshuffles `dataset` at the start of every pass.
    pub fn shuffled(mut dataset: Dataset, batch_size: NonZeroUsize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        dataset.shuffle(&mut rng);

        Self {
            dataset,
            batch_size,
            cursor: 0,
            shuffle: Some(rng),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Returns the next batch of inputs and targets.
    ///
    /// The last batch of a pass may hold fewer than `batch_size` samples.
    pub fn next_batch(&mut self) -> (Array2<f32>, Array2<f32>) {
        if self.cursor >= self.dataset.len() {
            self.cursor = 0;
            if let Some(rng) = &mut self.shuffle {
                self.dataset.shuffle(rng);
            }
        }

        let end = (self.cursor + self.batch_size.get()).min(self.dataset.len());
        let (x, y) = self.dataset.xy();
        let start = self.cursor;
        let batch = (
            x.slice(s![start..end, ..]).to_owned(),
            y.slice(s![start..end, ..]).to_owned(),
        );

        self.cursor = end;
        batch
    }
}

impl Iterator for CyclicLoader {
    type Item = (Array2<f32>, Array2<f32>);

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_batch())
    }
}
