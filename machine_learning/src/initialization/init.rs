use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use crate::{MlErr, Result, arch::ParamSpec};

/// An initialisation scheme for a single parameter tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Init {
    Const { value: f32 },
    Uniform { low: f32, high: f32 },
    Normal { mean: f32, std_dev: f32 },
    XavierUniform,
    Kaiming,
}

impl Init {
    /// Fills `out` with samples for the tensor described by `spec`.
    ///
    /// Fan in and fan out are taken from the first two dimensions of the tensor, a tensor with a
    /// single dimension has a fan in of one.
    ///
    /// # Returns
    /// An error if the distribution can't be built from the given values.
    pub fn fill<R: Rng>(&self, rng: &mut R, spec: &ParamSpec, out: &mut [f32]) -> Result<()> {
        let (fan_in, fan_out) = match spec.shape.as_slice() {
            [] => (1, 1),
            [n] => (1, *n),
            [i, o, ..] => (*i, *o),
        };

        match *self {
            Init::Const { value } => out.fill(value),
            Init::Uniform { low, high } => sample_into(rng, uniform(low, high)?, out),
            Init::Normal { mean, std_dev } => sample_into(rng, normal(mean, std_dev)?, out),
            Init::XavierUniform => {
                let range = (6. / (fan_in + fan_out) as f32).sqrt();
                sample_into(rng, uniform(-range, range)?, out);
            }
            Init::Kaiming => {
                let std_dev = (2. / fan_in as f32).sqrt();
                sample_into(rng, normal(0., std_dev)?, out);
            }
        }

        Ok(())
    }
}

fn uniform(low: f32, high: f32) -> Result<Uniform<f32>> {
    Uniform::new(low, high).map_err(|e| MlErr::InvalidConfig(format!("uniform({low}, {high}): {e}")))
}

fn normal(mean: f32, std_dev: f32) -> Result<Normal<f32>> {
    Normal::new(mean, std_dev)
        .map_err(|e| MlErr::InvalidConfig(format!("normal({mean}, {std_dev}): {e}")))
}

fn sample_into<R: Rng, D: Distribution<f32>>(rng: &mut R, distribution: D, out: &mut [f32]) {
    out.iter_mut()
        .zip(distribution.sample_iter(rng))
        .for_each(|(p, x)| *p = x);
}
