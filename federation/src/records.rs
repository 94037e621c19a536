use ndarray::Array1;

/// The seeds and aggregated scalars of every round still needed by some client.
///
/// Rounds are indexed globally from zero; pruning drops the oldest ones but keeps indices
/// stable.
#[derive(Debug, Clone, Default)]
pub struct SeedGradRecords {
    first_round: usize,
    seeds: Vec<Vec<u64>>,
    dir_grads: Vec<Vec<Array1<f32>>>,
}

impl SeedGradRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of the next round to be recorded.
    pub fn next_round(&self) -> usize {
        self.first_round + self.seeds.len()
    }

    /// Returns the oldest round still held.
    pub fn first_round(&self) -> usize {
        self.first_round
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    /// Appends a round.
    pub fn push(&mut self, seeds: Vec<u64>, dir_grads: Vec<Array1<f32>>) {
        self.seeds.push(seeds);
        self.dir_grads.push(dir_grads);
    }

    /// Returns every recorded round from `round` on, if they are all still held.
    pub fn since(&self, round: usize) -> Option<(&[Vec<u64>], &[Vec<Array1<f32>>])> {
        if round < self.first_round || round > self.next_round() {
            return None;
        }

        let start = round - self.first_round;
        Some((&self.seeds[start..], &self.dir_grads[start..]))
    }

    /// Drops every round before `round`.
    ///
    /// # Returns
    /// The amount of rounds dropped.
    pub fn prune_before(&mut self, round: usize) -> usize {
        let n = round.saturating_sub(self.first_round).min(self.seeds.len());
        self.seeds.drain(..n);
        self.dir_grads.drain(..n);
        self.first_round += n;
        n
    }
}
