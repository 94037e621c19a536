use crate::optimization::OptimizerState;

/// An immutable copy of a replica's parameters and optimizer state at a given round.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    round: usize,
    params: Box<[f32]>,
    optimizer: OptimizerState,
}

impl Checkpoint {
    pub(crate) fn new(round: usize, params: &[f32], optimizer: OptimizerState) -> Self {
        Self {
            round,
            params: params.into(),
            optimizer,
        }
    }

    /// Returns the round this checkpoint was taken at.
    pub fn round(&self) -> usize {
        self.round
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    pub fn optimizer(&self) -> &OptimizerState {
        &self.optimizer
    }
}
