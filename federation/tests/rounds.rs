mod common;

use federation::{
    Aggregation, CezoServer, FederatedClient, FederationErr, Result, SyncPolicy,
};
use machine_learning::{
    MlErr,
    estimation::{DifferenceMethod, RandomGradientEstimator},
};
use ndarray::{Array1, array};

/// Reports fixed scalars and counts the calls it gets.
struct ScriptedClient {
    scalars: Array1<f32>,
    data_len: usize,
    resets: usize,
    pulls: Vec<Vec<Vec<u64>>>,
    failures_left: usize,
    diverged: bool,
    diverged_on_update: Vec<bool>,
}

impl ScriptedClient {
    fn new(scalars: Array1<f32>, data_len: usize) -> Self {
        Self {
            scalars,
            data_len,
            resets: 0,
            pulls: Vec::new(),
            failures_left: 0,
            diverged: false,
            diverged_on_update: Vec::new(),
        }
    }

    fn failing(mut self, times: usize) -> Self {
        self.failures_left = times;
        self
    }
}

impl FederatedClient for ScriptedClient {
    fn local_update(&mut self, seeds: &[u64]) -> Result<Vec<Array1<f32>>> {
        self.diverged_on_update.push(self.diverged);
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(FederationErr::Config("local data unavailable".into()));
        }

        self.diverged = true;
        Ok(vec![self.scalars.clone(); seeds.len()])
    }

    fn reset_model(&mut self) -> Result<()> {
        self.resets += 1;
        self.diverged = false;
        Ok(())
    }

    fn pull_model(
        &mut self,
        seeds_list: &[Vec<u64>],
        _dir_grads_list: &[Vec<Array1<f32>>],
    ) -> Result<()> {
        self.pulls.push(seeds_list.to_vec());
        Ok(())
    }

    fn data_len(&self) -> usize {
        self.data_len
    }
}

fn scripted_server(aggregation: Aggregation) -> CezoServer<ScriptedClient> {
    let clients = vec![
        ScriptedClient::new(array![1., -2.], 10),
        ScriptedClient::new(array![3., 4.], 30),
    ];

    CezoServer::new(
        common::replica(),
        common::estimator(2),
        Box::new(machine_learning::arch::loss::Mse),
        clients,
        2,
        2,
        5,
    )
    .unwrap()
    .with_aggregation(aggregation)
}

#[test]
fn aggregation_rules_combine_client_scalars() {
    let cases = [
        (Aggregation::Mean, array![2., 1.]),
        (Aggregation::Sum, array![4., 2.]),
        (Aggregation::WeightedByDataLen, array![2.5, 2.5]),
    ];

    for (aggregation, expected) in cases {
        let mut server = scripted_server(aggregation);
        let report = server.train_one_step(0).unwrap();

        assert_eq!(report.dir_grads, vec![expected.clone(), expected]);
    }
}

#[test]
fn sampled_clients_are_reset_and_everyone_pulls_in_order() {
    let mut server = scripted_server(Aggregation::Mean);
    let first = server.train_one_step(0).unwrap();
    let second = server.train_one_step(3).unwrap();

    for client in server.clients() {
        assert_eq!(client.resets, 2);
        assert_eq!(client.pulls, [vec![first.seeds.clone()], vec![second.seeds.clone()]]);
    }
}

#[test]
fn lazy_clients_pull_only_what_they_missed() {
    let mut server = scripted_server(Aggregation::Mean).with_sync_policy(SyncPolicy::Lazy);
    let first = server.train_one_step(0).unwrap();
    server.train_one_step(1).unwrap();

    for client in server.clients() {
        assert_eq!(client.pulls, [vec![first.seeds.clone()]]);
    }
}

#[test]
fn failed_round_resets_every_sampled_client() {
    let clients = vec![
        ScriptedClient::new(array![1., -2.], 10),
        ScriptedClient::new(array![3., 4.], 30).failing(1),
    ];
    let mut server = CezoServer::new(
        common::replica(),
        common::estimator(2),
        Box::new(machine_learning::arch::loss::Mse),
        clients,
        2,
        2,
        5,
    )
    .unwrap();
    let initial = server.replica().params().to_vec();

    assert!(matches!(server.train_one_step(0), Err(FederationErr::Config(_))));
    assert_eq!(server.rounds(), 0);
    assert_eq!(server.replica().params(), initial);
    assert!(server.clients().iter().all(|client| !client.diverged));

    server.train_one_step(1).unwrap();
    assert_eq!(server.rounds(), 1);
    for client in server.clients() {
        assert_eq!(client.diverged_on_update, [false, false]);
    }
}

#[test]
fn out_of_order_rounds_are_rejected() {
    let mut server = scripted_server(Aggregation::Mean);
    server.train_one_step(4).unwrap();

    assert!(matches!(
        server.train_one_step(4),
        Err(FederationErr::OutOfOrderRound { got: 4, last: 4 })
    ));
    assert!(matches!(
        server.train_one_step(2),
        Err(FederationErr::OutOfOrderRound { got: 2, last: 4 })
    ));
    assert!(server.train_one_step(5).is_ok());
    assert_eq!(server.rounds(), 2);
}

#[test]
fn invalid_client_counts_are_rejected() {
    let build = |k: usize, steps: usize| {
        CezoServer::new(
            common::replica(),
            common::estimator(1),
            Box::new(machine_learning::arch::loss::Mse),
            vec![ScriptedClient::new(array![1.], 1)],
            k,
            steps,
            0,
        )
    };

    assert!(matches!(build(0, 1), Err(FederationErr::Config(_))));
    assert!(matches!(build(2, 1), Err(FederationErr::Config(_))));
    assert!(matches!(build(1, 0), Err(FederationErr::Config(_))));
    assert!(build(1, 1).is_ok());
}

#[test]
fn estimator_boundaries_fail_at_construction() {
    for (mu, num_pert) in [(0., 1), (1e-3, 0)] {
        assert!(matches!(
            RandomGradientEstimator::new(mu, num_pert, DifferenceMethod::Central),
            Err(MlErr::InvalidConfig(_))
        ));
    }
}
