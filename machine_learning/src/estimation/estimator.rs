use std::{fmt, num::NonZeroUsize, str::FromStr};

use log::trace;
use ndarray::{Array1, ArrayView1, ArrayView2};

use super::PerturbationSource;
use crate::{
    MlErr, Result,
    arch::{Model, loss::LossFn},
    error::check_size,
    params::ParamStore,
};

/// The finite difference formula used to estimate a directional derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifferenceMethod {
    /// `(loss(p + mu·d) - loss(p - mu·d)) / 2mu`, two extra forward passes per direction.
    Central,
    /// `(loss(p + mu·d) - loss(p)) / mu`, one extra forward pass per direction.
    Forward,
}

impl DifferenceMethod {
    fn denominator(&self, mu: f32) -> f32 {
        match self {
            DifferenceMethod::Central => 2. * mu,
            DifferenceMethod::Forward => mu,
        }
    }
}

impl FromStr for DifferenceMethod {
    type Err = MlErr;

    /// Parses `central` or `forward`, optionally prefixed with `rge-`.
    fn from_str(s: &str) -> Result<Self> {
        match s.strip_prefix("rge-").unwrap_or(s) {
            "central" => Ok(DifferenceMethod::Central),
            "forward" => Ok(DifferenceMethod::Forward),
            _ => Err(MlErr::InvalidConfig(format!(
                "grad estimate method {s} not supported"
            ))),
        }
    }
}

impl fmt::Display for DifferenceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DifferenceMethod::Central => f.write_str("central"),
            DifferenceMethod::Forward => f.write_str("forward"),
        }
    }
}

/// Random gradient estimator (RGE).
///
/// Estimates the gradient of a loss from loss evaluations only, probing `num_pert` random
/// directions derived from a seed. The result of an estimation is one scalar per direction;
/// together with the seed it is all that is needed to rebuild the gradient anywhere.
#[derive(Debug, Clone)]
pub struct RandomGradientEstimator {
    mu: f32,
    num_pert: NonZeroUsize,
    method: DifferenceMethod,
    normalize: bool,
}

impl RandomGradientEstimator {
    /// Creates a new `RandomGradientEstimator`.
    ///
    /// # Arguments
    /// * `mu` - The size of the perturbations, must be finite and positive.
    /// * `num_pert` - The amount of directions probed per seed, at least one.
    /// * `method` - The finite difference formula.
    ///
    /// # Returns
    /// A new estimator or a configuration error.
    pub fn new(mu: f32, num_pert: usize, method: DifferenceMethod) -> Result<Self> {
        if !mu.is_finite() || mu <= 0. {
            return Err(MlErr::InvalidConfig(format!(
                "mu must be finite and positive, got {mu}"
            )));
        }

        let num_pert = NonZeroUsize::new(num_pert).ok_or_else(|| {
            MlErr::InvalidConfig("the number of perturbations must be at least 1".into())
        })?;

        Ok(Self {
            mu,
            num_pert,
            method,
            normalize: false,
        })
    }

    /// Makes every direction unit length.
    pub fn with_normalized_perturbations(mut self) -> Self {
        self.normalize = true;
        self
    }

    pub fn mu(&self) -> f32 {
        self.mu
    }

    pub fn num_pert(&self) -> usize {
        self.num_pert.get()
    }

    pub fn method(&self) -> DifferenceMethod {
        self.method
    }

    /// Estimates the gradient of `loss_fn` at the current parameters over one batch.
    ///
    /// The estimated gradient, `Σ gᵢ·dᵢ / num_pert`, is written into the store's gradient
    /// buffer so a regular optimizer step applies it. Parameters are left untouched: every
    /// perturbed point is evaluated on a scratch copy.
    ///
    /// # Arguments
    /// * `model` - The architecture the parameters belong to.
    /// * `store` - The parameters and gradient buffer.
    /// * `seed` - The seed of the perturbation directions.
    /// * `x`, `y` - The batch.
    /// * `loss_fn` - The loss being minimized.
    ///
    /// # Returns
    /// The directional derivative estimated along each of the `num_pert` directions.
    pub fn compute_grad<M, L>(
        &self,
        model: &M,
        store: &mut ParamStore,
        seed: u64,
        x: ArrayView2<f32>,
        y: ArrayView2<f32>,
        loss_fn: &L,
    ) -> Result<Array1<f32>>
    where
        M: Model + ?Sized,
        L: LossFn + ?Sized,
    {
        let (specs, params, grad) = store.parts_mut();
        let n = params.len();
        let eval = |p: &[f32]| -> Result<f32> {
            let y_pred = model.forward(p, x)?;
            Ok(loss_fn.loss(y_pred.view(), y))
        };

        let base_loss = match self.method {
            DifferenceMethod::Forward => Some(eval(params)?),
            DifferenceMethod::Central => None,
        };

        let mut source = PerturbationSource::new(seed, self.normalize);
        let mut direction = vec![0.; n];
        let mut scratch = vec![0.; n];
        let mut dir_grads = Array1::zeros(self.num_pert.get());
        grad.fill(0.);

        for dir_grad in dir_grads.iter_mut() {
            source.next_direction(specs, &mut direction);

            perturb(&mut scratch, params, &direction, self.mu);
            let plus_loss = eval(&scratch)?;

            let minus_loss = match base_loss {
                Some(loss) => loss,
                None => {
                    perturb(&mut scratch, params, &direction, -self.mu);
                    eval(&scratch)?
                }
            };

            *dir_grad = (plus_loss - minus_loss) / self.method.denominator(self.mu);
            accumulate(grad, &direction, *dir_grad);
        }

        self.average(grad);
        trace!(seed = seed, num_pert = self.num_pert.get(); "estimated directional derivatives");

        Ok(dir_grads)
    }

    /// Rebuilds the gradient of a past estimation from its seed and scalars and writes it into
    /// the store's gradient buffer.
    ///
    /// No loss is evaluated, so this is as cheap as generating the directions.
    ///
    /// # Returns
    /// An error if `dir_grads` doesn't hold exactly `num_pert` scalars.
    pub fn generate_then_put_grad(
        &self,
        store: &mut ParamStore,
        seed: u64,
        dir_grads: ArrayView1<f32>,
    ) -> Result<()> {
        check_size("gradient scalars", dir_grads.len(), self.num_pert.get())?;

        let (specs, _, grad) = store.parts_mut();
        let mut source = PerturbationSource::new(seed, self.normalize);
        let mut direction = vec![0.; grad.len()];
        grad.fill(0.);

        for &dir_grad in dir_grads {
            source.next_direction(specs, &mut direction);
            accumulate(grad, &direction, dir_grad);
        }

        self.average(grad);
        Ok(())
    }

    fn average(&self, grad: &mut [f32]) {
        let n = self.num_pert.get() as f32;
        grad.iter_mut().for_each(|g| *g /= n);
    }
}

/// Writes `params + alpha * direction` into `out`.
fn perturb(out: &mut [f32], params: &[f32], direction: &[f32], alpha: f32) {
    out.iter_mut()
        .zip(params)
        .zip(direction)
        .for_each(|((o, p), d)| *o = p + alpha * d);
}

fn accumulate(grad: &mut [f32], direction: &[f32], dir_grad: f32) {
    grad.iter_mut()
        .zip(direction)
        .for_each(|(g, d)| *g += dir_grad * d);
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::arch::{Sequential, layers::Layer, loss::Mse};

    fn linear() -> (Sequential, ParamStore) {
        let model = Sequential::new([Layer::dense((2, 1), None)]);
        let store = ParamStore::new(model.param_specs(), vec![0.5, -0.25, 0.1]).unwrap();
        (model, store)
    }

    #[test]
    fn rejects_invalid_config() {
        let method = DifferenceMethod::Central;
        assert!(RandomGradientEstimator::new(0., 1, method).is_err());
        assert!(RandomGradientEstimator::new(-1e-3, 1, method).is_err());
        assert!(RandomGradientEstimator::new(f32::NAN, 1, method).is_err());
        assert!(RandomGradientEstimator::new(1e-3, 0, method).is_err());
        assert!(RandomGradientEstimator::new(1e-3, 1, method).is_ok());
    }

    #[test]
    fn parses_methods() {
        assert_eq!("rge-central".parse::<DifferenceMethod>(), Ok(DifferenceMethod::Central));
        assert_eq!("forward".parse::<DifferenceMethod>(), Ok(DifferenceMethod::Forward));
        assert!("rge-backward".parse::<DifferenceMethod>().is_err());
    }

    #[test]
    fn estimation_is_deterministic() {
        let estimator = RandomGradientEstimator::new(1e-3, 3, DifferenceMethod::Central).unwrap();
        let x = array![[1., 2.], [0.5, -1.]];
        let y = array![[1.], [0.]];

        let (model, mut a) = linear();
        let (_, mut b) = linear();
        let ga = estimator.compute_grad(&model, &mut a, 42, x.view(), y.view(), &Mse).unwrap();
        let gb = estimator.compute_grad(&model, &mut b, 42, x.view(), y.view(), &Mse).unwrap();

        assert_eq!(ga, gb);
        assert_eq!(a.grad(), b.grad());
        assert_eq!(a.params(), b.params());
    }

    #[test]
    fn estimation_leaves_params_untouched() {
        let estimator = RandomGradientEstimator::new(1e-2, 2, DifferenceMethod::Forward).unwrap();
        let x = array![[1., 2.]];
        let y = array![[3.]];

        let (model, mut store) = linear();
        let before = store.params().to_vec();
        estimator.compute_grad(&model, &mut store, 5, x.view(), y.view(), &Mse).unwrap();

        assert_eq!(store.params(), before);
        assert!(store.grad().iter().any(|&g| g != 0.));
    }

    #[test]
    fn regenerated_gradient_matches_estimated_one() {
        let estimator = RandomGradientEstimator::new(1e-3, 4, DifferenceMethod::Central).unwrap();
        let x = array![[1., 2.], [3., 4.]];
        let y = array![[1.], [2.]];

        let (model, mut store) = linear();
        let dir_grads = estimator.compute_grad(&model, &mut store, 7, x.view(), y.view(), &Mse).unwrap();
        let estimated = store.grad().to_vec();

        store.zero_grad();
        estimator.generate_then_put_grad(&mut store, 7, dir_grads.view()).unwrap();
        assert_eq!(store.grad(), estimated);
    }

    #[test]
    fn central_difference_tracks_true_directional_derivative() {
        // loss(p) = (p0 + p1 + b - 1)^2 for x = [1, 1] and y = 1
        let estimator = RandomGradientEstimator::new(1e-3, 64, DifferenceMethod::Central).unwrap();
        let model = Sequential::new([Layer::dense((2, 1), None)]);
        let mut store = ParamStore::new(model.param_specs(), vec![1., 1., 0.]).unwrap();
        let x = array![[1., 1.]];
        let y = array![[1.]];

        estimator.compute_grad(&model, &mut store, 3, x.view(), y.view(), &Mse).unwrap();

        // true gradient is 2 * (2 - 1) * [1, 1, 1]
        let dot: f32 = store.grad().iter().map(|g| g * 2.).sum();
        assert!(dot > 0.);
    }

    /// Recomputes `compute_grad` by hand: the scalar of every direction and the averaged
    /// gradient they add up to.
    fn hand_estimate(
        method: DifferenceMethod,
        mu: f32,
        num_pert: usize,
        seed: u64,
    ) -> (Array1<f32>, Vec<f32>) {
        let (model, store) = linear();
        let x = array![[1., 2.], [-0.5, 3.]];
        let y = array![[3.], [-1.]];
        let params = store.params();
        let n = params.len();

        let loss_at = |p: &[f32]| Mse.loss(model.forward(p, x.view()).unwrap().view(), y.view());
        let shifted = |d: &[f32], alpha: f32| -> Vec<f32> {
            params.iter().zip(d).map(|(p, d)| p + alpha * d).collect()
        };

        let mut source = PerturbationSource::new(seed, false);
        let mut direction = vec![0.; n];
        let mut grad = vec![0.; n];
        let mut dir_grads = Vec::new();

        for _ in 0..num_pert {
            source.next_direction(store.specs(), &mut direction);
            let plus = loss_at(&shifted(&direction, mu));

            let g = match method {
                DifferenceMethod::Central => {
                    (plus - loss_at(&shifted(&direction, -mu))) / (2. * mu)
                }
                DifferenceMethod::Forward => (plus - loss_at(params)) / mu,
            };

            grad.iter_mut().zip(&direction).for_each(|(acc, d)| *acc += g * d);
            dir_grads.push(g);
        }

        grad.iter_mut().for_each(|acc| *acc /= num_pert as f32);
        (Array1::from(dir_grads), grad)
    }

    #[test]
    fn difference_formulas_match_hand_computation() {
        let x = array![[1., 2.], [-0.5, 3.]];
        let y = array![[3.], [-1.]];

        for method in [DifferenceMethod::Central, DifferenceMethod::Forward] {
            for num_pert in [1, 3] {
                let estimator = RandomGradientEstimator::new(1e-2, num_pert, method).unwrap();
                let (model, mut store) = linear();

                let dir_grads = estimator
                    .compute_grad(&model, &mut store, 5, x.view(), y.view(), &Mse)
                    .unwrap();
                let (expected, expected_grad) = hand_estimate(method, 1e-2, num_pert, 5);

                assert_eq!(dir_grads, expected, "{method} with {num_pert} directions");
                assert_eq!(store.grad(), expected_grad, "{method} with {num_pert} directions");
            }
        }
    }

    #[test]
    fn rejects_wrong_scalar_count() {
        let estimator = RandomGradientEstimator::new(1e-3, 2, DifferenceMethod::Central).unwrap();
        let (_, mut store) = linear();
        let dir_grads = array![1.];

        assert!(estimator.generate_then_put_grad(&mut store, 1, dir_grads.view()).is_err());
    }
}
