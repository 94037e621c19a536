use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, StandardNormal};

use crate::arch::ParamSpec;

/// A pseudo-random source of perturbation directions, built fresh from a seed.
///
/// Two sources built from the same seed yield the same sequence of directions for the same
/// parameter layout, bit for bit. Nothing else ever draws from it.
#[derive(Debug, Clone)]
pub struct PerturbationSource {
    rng: StdRng,
    normalize: bool,
}

impl PerturbationSource {
    /// Creates a new `PerturbationSource`.
    ///
    /// # Arguments
    /// * `seed` - The seed the whole sequence of directions derives from.
    /// * `normalize` - Whether directions are scaled to unit length.
    pub fn new(seed: u64, normalize: bool) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            normalize,
        }
    }

    /// Writes the next direction into `out`, one standard normal segment per tensor.
    ///
    /// `out` must be as long as all the tensors in `specs` together.
    pub fn next_direction(&mut self, specs: &[ParamSpec], out: &mut [f32]) {
        let mut rest = &mut *out;
        for spec in specs {
            let (chunk, tail) = rest.split_at_mut(spec.len());
            for (d, x) in chunk.iter_mut().zip(StandardNormal.sample_iter(&mut self.rng)) {
                *d = x;
            }

            rest = tail;
        }

        if !self.normalize {
            return;
        }

        let norm = out.iter().map(|d| d * d).sum::<f32>().sqrt();
        if norm > 0. {
            out.iter_mut().for_each(|d| *d /= norm);
        }
    }
}
