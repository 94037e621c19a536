mod common;

use std::num::NonZeroUsize;

use federation::{Client, FederatedClient};
use machine_learning::{
    arch::{Sequential, layers::Layer, loss::Mse},
    dataset::{CyclicLoader, Dataset},
    estimation::{DifferenceMethod, RandomGradientEstimator},
    initialization::ParamGen,
    optimization::GradientDescent,
    params::ParamStore,
    training::Replica,
};
use ndarray::array;

fn single_batch_client(id: usize) -> Client {
    let model = Sequential::new([Layer::dense((2, 1), None)]);
    let store = ParamStore::for_model(&model, &mut ParamGen::xavier(0)).unwrap();
    let replica =
        Replica::new(Box::new(model), store, Box::new(GradientDescent::new(0.1))).unwrap();

    let dataset = Dataset::new(vec![1., 2., 1., -1., 0.5, 0.], 2, 1).unwrap();
    let loader = CyclicLoader::new(dataset, NonZeroUsize::new(2).unwrap());
    let estimator = RandomGradientEstimator::new(0.001, 1, DifferenceMethod::Central).unwrap();

    Client::new(id, replica, estimator, Box::new(Mse), loader)
}

#[test]
fn identical_clients_report_identical_scalars() {
    let mut a = single_batch_client(0);
    let mut b = single_batch_client(1);

    let ga = a.local_update(&[42]).unwrap();
    let gb = b.local_update(&[42]).unwrap();

    assert_eq!(ga.len(), 1);
    assert_eq!(ga[0].len(), 1);
    assert_eq!(ga, gb);
    assert_eq!(a.params(), b.params());
}

#[test]
fn replaying_twice_from_the_same_checkpoint_is_identical() {
    let estimator = common::estimator(2);
    let seeds = [7, 8, 9];
    let dir_grads = [array![0.3, -0.2], array![-0.1, 0.05], array![0.7, 0.0]];

    let mut replica = common::replica();
    let checkpoint = replica.checkpoint(0);

    replica.replay(&estimator, &seeds, &dir_grads).unwrap();
    let first = replica.checkpoint(1);

    replica.restore(&checkpoint).unwrap();
    replica.replay(&estimator, &seeds, &dir_grads).unwrap();

    assert_ne!(first.params(), checkpoint.params());
    assert_eq!(replica.checkpoint(1), first);
}

#[test]
fn clients_pulling_the_same_history_agree() {
    let seeds_list = vec![vec![1, 2], vec![3]];
    let dir_grads_list = vec![vec![array![0.3], array![-0.1]], vec![array![0.7]]];

    let mut a = single_batch_client(0);
    let mut b = single_batch_client(1);
    a.local_update(&[11, 12]).unwrap();

    a.pull_model(&seeds_list, &dir_grads_list).unwrap();
    b.pull_model(&seeds_list, &dir_grads_list).unwrap();

    assert_eq!(a.params(), b.params());
    assert_eq!(a.checkpoint(), b.checkpoint());
    assert_eq!(a.checkpoint().round(), 2);
}

#[test]
fn servers_with_the_same_seed_follow_the_same_trajectory() {
    let mut a = common::server(3, 2, 2, 2);
    let mut b = common::server(3, 2, 2, 2);

    for iteration in 0..4 {
        assert_eq!(a.train_one_step(iteration).unwrap(), b.train_one_step(iteration).unwrap());
    }

    assert_eq!(a.replica().params(), b.replica().params());
}
