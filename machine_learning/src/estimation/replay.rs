use ndarray::Array1;

use super::RandomGradientEstimator;
use crate::{Result, error::check_size, optimization::Optimizer, params::ParamStore};

/// Replays a sequence of seeded gradient estimations on a replica.
///
/// For every `(seed, dir_grads)` pair, in order, the gradient is rebuilt from the seed and the
/// optimizer takes one step with it. A replica that replays the same history from the same
/// starting parameters and optimizer state ends up bit-identical to the one that computed it.
///
/// # Arguments
/// * `store` - The replica's parameters and gradient buffer.
/// * `optimizer` - The replica's optimizer.
/// * `estimator` - An estimator configured like the one that produced the history.
/// * `seeds` - The seeds of every estimation.
/// * `dir_grads` - The scalars of every estimation, matching `seeds` one to one.
///
/// # Returns
/// An error if the history is malformed, in which case the replica isn't modified.
pub fn update_model_given_seeds<O: Optimizer + ?Sized>(
    store: &mut ParamStore,
    optimizer: &mut O,
    estimator: &RandomGradientEstimator,
    seeds: &[u64],
    dir_grads: &[Array1<f32>],
) -> Result<()> {
    check_size("gradient scalar sets", dir_grads.len(), seeds.len())?;
    for scalars in dir_grads {
        check_size("gradient scalars", scalars.len(), estimator.num_pert())?;
    }

    store.zero_grad();
    for (&seed, scalars) in seeds.iter().zip(dir_grads) {
        estimator.generate_then_put_grad(store, seed, scalars.view())?;
        store.step(optimizer)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::{
        arch::{Model, Sequential, layers::Layer, loss::Mse},
        estimation::DifferenceMethod,
        optimization::{Adam, GradientDescent, GradientDescentWithMomentum},
    };

    fn setup() -> (Sequential, ParamStore) {
        let model = Sequential::new([Layer::dense((2, 2), None), Layer::dense((2, 1), None)]);
        let params = (0..model.size()).map(|i| (i as f32 - 4.) / 10.).collect();
        let store = ParamStore::new(model.param_specs(), params).unwrap();
        (model, store)
    }

    fn train<O: Optimizer>(
        model: &Sequential,
        store: &mut ParamStore,
        optimizer: &mut O,
        estimator: &RandomGradientEstimator,
        seeds: &[u64],
    ) -> Vec<Array1<f32>> {
        let x = array![[1., 2.], [-1., 0.5], [0., 1.]];
        let y = array![[1.], [0.], [0.5]];

        seeds
            .iter()
            .map(|&seed| {
                let dir_grads = estimator
                    .compute_grad(model, store, seed, x.view(), y.view(), &Mse)
                    .unwrap();
                store.step(optimizer).unwrap();
                dir_grads
            })
            .collect()
    }

    #[test]
    fn replay_reproduces_training() {
        let estimator = RandomGradientEstimator::new(1e-3, 3, DifferenceMethod::Central).unwrap();
        let seeds = [11, 22, 33, 44];

        let (model, mut trained) = setup();
        let (_, mut replayed) = setup();
        let mut opt_a = GradientDescent::new(1e-2);
        let mut opt_b = GradientDescent::new(1e-2);

        let history = train(&model, &mut trained, &mut opt_a, &estimator, &seeds);
        update_model_given_seeds(&mut replayed, &mut opt_b, &estimator, &seeds, &history).unwrap();

        assert_eq!(trained.params(), replayed.params());
    }

    #[test]
    fn replay_reproduces_stateful_optimizers() {
        let estimator = RandomGradientEstimator::new(1e-3, 2, DifferenceMethod::Forward).unwrap();
        let seeds = [5, 6, 7];

        let (model, mut trained) = setup();
        let (_, mut replayed) = setup();
        let len = trained.len();
        let mut opt_a = Adam::new(len, 1e-2, 0.9, 0.999, 1e-8);
        let mut opt_b = Adam::new(len, 1e-2, 0.9, 0.999, 1e-8);

        let history = train(&model, &mut trained, &mut opt_a, &estimator, &seeds);
        update_model_given_seeds(&mut replayed, &mut opt_b, &estimator, &seeds, &history).unwrap();

        assert_eq!(trained.params(), replayed.params());
        assert_eq!(opt_a.state(), opt_b.state());

        let (_, mut momentum_trained) = setup();
        let (_, mut momentum_replayed) = setup();
        let mut opt_a = GradientDescentWithMomentum::new(len, 1e-2, 0.9);
        let mut opt_b = GradientDescentWithMomentum::new(len, 1e-2, 0.9);

        let history = train(&model, &mut momentum_trained, &mut opt_a, &estimator, &seeds);
        update_model_given_seeds(&mut momentum_replayed, &mut opt_b, &estimator, &seeds, &history)
            .unwrap();

        assert_eq!(momentum_trained.params(), momentum_replayed.params());
    }

    #[test]
    fn empty_history_is_a_no_op() {
        let estimator = RandomGradientEstimator::new(1e-3, 1, DifferenceMethod::Central).unwrap();
        let (_, mut store) = setup();
        let before = store.params().to_vec();

        update_model_given_seeds(&mut store, &mut GradientDescent::new(1.), &estimator, &[], &[])
            .unwrap();

        assert_eq!(store.params(), before);
    }

    #[test]
    fn malformed_history_is_rejected_before_any_step() {
        let estimator = RandomGradientEstimator::new(1e-3, 2, DifferenceMethod::Central).unwrap();
        let (_, mut store) = setup();
        let before = store.params().to_vec();
        let mut optimizer = GradientDescent::new(1.);

        let mismatched = [array![1., 2.]];
        assert!(update_model_given_seeds(&mut store, &mut optimizer, &estimator, &[1, 2], &mismatched).is_err());

        let short = [array![1., 2.], array![3.]];
        assert!(update_model_given_seeds(&mut store, &mut optimizer, &estimator, &[1, 2], &short).is_err());

        assert_eq!(store.params(), before);
    }
}
