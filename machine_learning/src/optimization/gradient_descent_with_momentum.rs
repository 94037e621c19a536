use super::{Optimizer, OptimizerState};
use crate::{MlErr, Result, error::check_size};

/// Gradient descent with a heavy-ball momentum buffer.
#[derive(Debug, Clone)]
pub struct GradientDescentWithMomentum {
    learning_rate: f32,
    momentum: f32,
    weight_decay: f32,
    velocity: Box<[f32]>,
}

impl GradientDescentWithMomentum {
    /// Creates a new `GradientDescentWithMomentum` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `momentum` - The decay of the velocity buffer between steps.
    ///
    /// # Returns
    /// A new `GradientDescentWithMomentum` instance.
    pub fn new(len: usize, learning_rate: f32, momentum: f32) -> Self {
        Self {
            learning_rate,
            momentum,
            weight_decay: 0.,
            velocity: vec![0.; len].into_boxed_slice(),
        }
    }

    /// Adds an L2 penalty of `weight_decay` to every step.
    pub fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }
}

impl Optimizer for GradientDescentWithMomentum {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_size("gradient", grad.len(), params.len())?;
        check_size("velocity", self.velocity.len(), params.len())?;

        let lr = self.learning_rate;
        let mu = self.momentum;
        let wd = self.weight_decay;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.velocity.iter_mut())
            .for_each(|((p, g), v)| {
                *v = (mu * *v) + g + wd * *p;
                *p -= lr * *v;
            });

        Ok(())
    }

    fn state(&self) -> OptimizerState {
        OptimizerState::GradientDescentWithMomentum {
            velocity: self.velocity.clone(),
        }
    }

    fn load_state(&mut self, state: &OptimizerState) -> Result<()> {
        let OptimizerState::GradientDescentWithMomentum { velocity } = state else {
            return Err(MlErr::StateMismatch {
                expected: "gradient descent with momentum",
                got: state.kind(),
            });
        };

        check_size("velocity", velocity.len(), self.velocity.len())?;
        self.velocity.copy_from_slice(velocity);
        Ok(())
    }
}
