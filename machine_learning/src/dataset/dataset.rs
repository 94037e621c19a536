use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayView2, Axis};
use rand::{Rng, seq::SliceRandom};

use super::shard_range;
use crate::{MlErr, Result};

/// An in-memory supervised dataset.
///
/// Every row holds the `x_size` input features followed by the `y_size` target values.
#[derive(Debug, Clone)]
pub struct Dataset {
    samples: Array2<f32>,
    x_size: usize,
}

impl Dataset {
    /// Creates a new `Dataset` from row-major samples.
    ///
    /// # Arguments
    /// * `data` - The samples, each `x_size + y_size` long.
    /// * `x_size` - The amount of input features per sample.
    /// * `y_size` - The amount of target values per sample.
    ///
    /// # Returns
    /// A new dataset, or an error if `data` can't be split into whole non-empty rows.
    pub fn new(data: Vec<f32>, x_size: usize, y_size: usize) -> Result<Self> {
        let row = x_size + y_size;
        if x_size == 0 || y_size == 0 {
            return Err(MlErr::InvalidConfig(format!(
                "a sample needs inputs and targets, got x_size={x_size} and y_size={y_size}"
            )));
        }

        if data.is_empty() {
            return Err(MlErr::EmptyDataset);
        }

        let got = data.len();
        let samples =
            Array2::from_shape_vec((got / row, row), data).map_err(|_| MlErr::SizeMismatch {
                what: "dataset",
                got,
                expected: got.next_multiple_of(row),
            })?;

        Ok(Self { samples, x_size })
    }

    /// Builds a dataset from already separated inputs and targets.
    pub fn from_parts(x: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<Self> {
        if x.nrows() != y.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "dataset targets",
                got: y.nrows(),
                expected: x.nrows(),
            });
        }

        let samples = ndarray::concatenate(Axis(1), &[x, y]).map_err(|_| MlErr::SizeMismatch {
            what: "dataset rows",
            got: y.nrows(),
            expected: x.nrows(),
        })?;

        if samples.is_empty() {
            return Err(MlErr::EmptyDataset);
        }

        Ok(Self {
            samples,
            x_size: x.ncols(),
        })
    }

    /// Returns the amount of samples.
    pub fn len(&self) -> usize {
        self.samples.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x_size(&self) -> usize {
        self.x_size
    }

    pub fn y_size(&self) -> usize {
        self.samples.ncols() - self.x_size
    }

    /// Returns the inputs and targets of every sample.
    pub fn xy(&self) -> (ArrayView2<'_, f32>, ArrayView2<'_, f32>) {
        self.samples.view().split_at(Axis(1), self.x_size)
    }

    /// Shuffles the order of the samples.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        let mut order: Vec<_> = (0..self.len()).collect();
        order.shuffle(rng);
        self.samples = self.samples.select(Axis(0), &order);
    }

    /// Iterates the dataset in batches of at most `batch_size` samples.
    ///
    /// The last batch holds the remaining samples and may be smaller.
    pub fn batches(
        &self,
        batch_size: NonZeroUsize,
    ) -> impl Iterator<Item = (ArrayView2<'_, f32>, ArrayView2<'_, f32>)> {
        let x_size = self.x_size;
        self.samples
            .axis_chunks_iter(Axis(0), batch_size.get())
            .map(move |rows| rows.split_at(Axis(1), x_size))
    }

    /// Returns the samples in `[start, end)` as a new dataset.
    fn slice(&self, start: usize, end: usize) -> Result<Self> {
        if start >= end {
            return Err(MlErr::EmptyDataset);
        }

        Ok(Self {
            samples: self.samples.slice(ndarray::s![start..end, ..]).to_owned(),
            x_size: self.x_size,
        })
    }

    /// Returns the `shard_id`-th of `num_shards` balanced, contiguous shards.
    ///
    /// # Returns
    /// The shard or an error if it would be empty.
    pub fn shard(&self, shard_id: usize, num_shards: NonZeroUsize) -> Result<Self> {
        if shard_id >= num_shards.get() {
            return Err(MlErr::SizeMismatch {
                what: "shard id",
                got: shard_id,
                expected: num_shards.get() - 1,
            });
        }

        let range = shard_range(self.len(), shard_id, num_shards.get());
        self.slice(range.start, range.end)
    }

    /// Splits the dataset in two, the first one holding `ratio` of the samples.
    ///
    /// # Returns
    /// Both halves or an error if either would be empty.
    pub fn split(&self, ratio: f32) -> Result<(Self, Self)> {
        if !(0. ..=1.).contains(&ratio) {
            return Err(MlErr::InvalidConfig(format!(
                "split ratio must be in [0, 1], got {ratio}"
            )));
        }

        let at = (self.len() as f32 * ratio).round() as usize;
        Ok((self.slice(0, at)?, self.slice(at, self.len())?))
    }
}
