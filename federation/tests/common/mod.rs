#![allow(dead_code)]

use std::num::NonZeroUsize;

use federation::{CezoServer, Client};
use machine_learning::{
    arch::{Sequential, activations::ActFn, layers::Layer, loss::CrossEntropy},
    dataset::{CyclicLoader, Dataset, gaussian_blobs},
    estimation::{DifferenceMethod, RandomGradientEstimator},
    initialization::ParamGen,
    optimization::GradientDescentWithMomentum,
    params::ParamStore,
    training::Replica,
};

pub fn blobs() -> Dataset {
    gaussian_blobs(3, 2, 12, 0.5, 7).unwrap()
}

pub fn estimator(num_pert: usize) -> RandomGradientEstimator {
    RandomGradientEstimator::new(1e-3, num_pert, DifferenceMethod::Central).unwrap()
}

pub fn replica() -> Replica {
    let model = Sequential::new([
        Layer::dense((2, 5), Some(ActFn::tanh())),
        Layer::dense((5, 3), None),
    ]);
    let store = ParamStore::for_model(&model, &mut ParamGen::xavier(17)).unwrap();
    let optimizer = GradientDescentWithMomentum::new(store.len(), 0.01, 0.9).with_weight_decay(1e-4);
    Replica::new(Box::new(model), store, Box::new(optimizer)).unwrap()
}

pub fn clients(n: usize, num_pert: usize) -> Vec<Client> {
    let data = blobs();
    let shards = NonZeroUsize::new(n).unwrap();
    let batch_size = NonZeroUsize::new(4).unwrap();

    (0..n)
        .map(|i| {
            let loader = CyclicLoader::shuffled(data.shard(i, shards).unwrap(), batch_size, i as u64);
            Client::new(i, replica(), estimator(num_pert), Box::new(CrossEntropy::new()), loader)
        })
        .collect()
}

pub fn server(n: usize, k: usize, steps: usize, num_pert: usize) -> CezoServer<Client> {
    CezoServer::new(
        replica(),
        estimator(num_pert),
        Box::new(CrossEntropy::new()),
        clients(n, num_pert),
        k,
        steps,
        2024,
    )
    .unwrap()
}
