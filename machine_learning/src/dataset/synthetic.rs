use ndarray::Array2;
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};

use super::Dataset;
use crate::{MlErr, Result};

/// Generates a classification dataset of isotropic gaussian blobs, one per class.
///
/// Class centers are drawn uniformly from `[-10, 10]^features` and targets are one-hot encoded.
///
/// # Arguments
/// * `classes` - The amount of blobs.
/// * `features` - The dimension of the inputs.
/// * `samples_per_class` - The amount of samples drawn around each center.
/// * `spread` - The standard deviation of every blob.
/// * `seed` - The seed for both centers and samples.
pub fn gaussian_blobs(
    classes: usize,
    features: usize,
    samples_per_class: usize,
    spread: f32,
    seed: u64,
) -> Result<Dataset> {
    if classes == 0 || features == 0 || samples_per_class == 0 {
        return Err(MlErr::EmptyDataset);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0., spread)
        .map_err(|e| MlErr::InvalidConfig(format!("blob spread {spread}: {e}")))?;
    let center = rand_distr::Uniform::new_inclusive(-10f32, 10.)
        .map_err(|e| MlErr::InvalidConfig(e.to_string()))?;

    let centers = Array2::from_shape_simple_fn((classes, features), || center.sample(&mut rng));
    let n = classes * samples_per_class;
    let mut x = Array2::zeros((n, features));
    let mut y = Array2::zeros((n, classes));

    for i in 0..n {
        let class = i % classes;
        y[[i, class]] = 1.;

        for j in 0..features {
            x[[i, j]] = centers[[class, j]] + noise.sample(&mut rng);
        }
    }

    Dataset::from_parts(x.view(), y.view())
}
