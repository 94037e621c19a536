use super::{Optimizer, OptimizerState};
use crate::{MlErr, Result, error::check_size};

/// Plain gradient descent, stateless between steps.
#[derive(Debug, Clone)]
pub struct GradientDescent {
    learning_rate: f32,
    weight_decay: f32,
}

impl GradientDescent {
    /// Creates a new `GradientDescent` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    ///
    /// # Returns
    /// A new `GradientDescent` instance.
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            weight_decay: 0.,
        }
    }

    /// Adds an L2 penalty of `weight_decay` to every step.
    pub fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }
}

impl Optimizer for GradientDescent {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_size("gradient", grad.len(), params.len())?;

        let lr = self.learning_rate;
        let wd = self.weight_decay;

        for (p, g) in params.iter_mut().zip(grad) {
            *p -= lr * (g + wd * *p);
        }

        Ok(())
    }

    fn state(&self) -> OptimizerState {
        OptimizerState::GradientDescent
    }

    fn load_state(&mut self, state: &OptimizerState) -> Result<()> {
        match state {
            OptimizerState::GradientDescent => Ok(()),
            other => Err(MlErr::StateMismatch {
                expected: "gradient descent",
                got: other.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_against_the_gradient() {
        let mut optimizer = GradientDescent::new(0.5);
        let mut params = [1., 2.];

        optimizer.update_params(&[2., -2.], &mut params).unwrap();
        assert_eq!(params, [0., 3.]);
    }

    #[test]
    fn weight_decay_shrinks_params() {
        let mut optimizer = GradientDescent::new(0.5).with_weight_decay(1.);
        let mut params = [2.];

        optimizer.update_params(&[0.], &mut params).unwrap();
        assert_eq!(params, [1.]);
    }

    #[test]
    fn size_mismatch() {
        let mut optimizer = GradientDescent::new(0.5);
        assert!(optimizer.update_params(&[1.], &mut [0., 0.]).is_err());
    }
}
