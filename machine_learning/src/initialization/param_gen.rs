use rand::{SeedableRng, rngs::StdRng};

use super::Init;
use crate::{Result, arch::ParamSpec};

/// Generates the initial parameters of a model from a seed.
///
/// Every participant of a federation builds its replica with the same seed so all of them
/// start from the same point of the parameter space.
#[derive(Debug, Clone)]
pub struct ParamGen {
    rng: StdRng,
    weight_init: Init,
    bias_init: Init,
}

impl ParamGen {
    /// Creates a new `ParamGen`.
    ///
    /// # Arguments
    /// * `seed` - The seed for the generator's rng.
    /// * `weight_init` - The scheme used for tensors with two or more dimensions.
    /// * `bias_init` - The scheme used for tensors with a single dimension.
    pub fn new(seed: u64, weight_init: Init, bias_init: Init) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            weight_init,
            bias_init,
        }
    }

    /// Returns a generator with Xavier uniform weights and zero biases.
    pub fn xavier(seed: u64) -> Self {
        Self::new(seed, Init::XavierUniform, Init::Const { value: 0. })
    }

    /// Generates the flat parameters for the given tensors, in order.
    pub fn generate(&mut self, specs: &[ParamSpec]) -> Result<Vec<f32>> {
        let size = specs.iter().map(ParamSpec::len).sum();
        let mut params = vec![0.; size];
        let mut rest = params.as_mut_slice();

        for spec in specs {
            let (chunk, tail) = rest.split_at_mut(spec.len());
            let init = match spec.shape.len() {
                0 | 1 => self.bias_init,
                _ => self.weight_init,
            };

            init.fill(&mut self.rng, spec, chunk)?;
            rest = tail;
        }

        Ok(params)
    }
}
