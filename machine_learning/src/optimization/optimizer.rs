use crate::Result;

/// A value-copied snapshot of everything an optimizer carries between steps.
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizerState {
    GradientDescent,
    GradientDescentWithMomentum {
        velocity: Box<[f32]>,
    },
    Adam {
        beta1_t: f32,
        beta2_t: f32,
        v: Box<[f32]>,
        s: Box<[f32]>,
    },
}

impl OptimizerState {
    /// Returns the name of the optimizer this state belongs to.
    pub fn kind(&self) -> &'static str {
        match self {
            OptimizerState::GradientDescent => "gradient descent",
            OptimizerState::GradientDescentWithMomentum { .. } => "gradient descent with momentum",
            OptimizerState::Adam { .. } => "adam",
        }
    }
}

/// Defines the strategy for updating model parameters based on a gradient.
pub trait Optimizer {
    /// Updates the provided parameters using the given gradient.
    ///
    /// # Arguments
    /// * `grad` - A reference to the model's gradient.
    /// * `params` - The parameters to update.
    ///
    /// # Returns
    /// An error if there's a mismatch in the sizes of `grad` and `params`.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()>;

    /// Takes a snapshot of the internal state of the optimizer.
    fn state(&self) -> OptimizerState;

    /// Overwrites the internal state of the optimizer with a previous snapshot.
    ///
    /// # Returns
    /// An error if the snapshot was taken from a different kind or size of optimizer.
    fn load_state(&mut self, state: &OptimizerState) -> Result<()>;
}

impl<O: Optimizer + ?Sized> Optimizer for Box<O> {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        (**self).update_params(grad, params)
    }

    fn state(&self) -> OptimizerState {
        (**self).state()
    }

    fn load_state(&mut self, state: &OptimizerState) -> Result<()> {
        (**self).load_state(state)
    }
}
