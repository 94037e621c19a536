use super::{Optimizer, OptimizerState};
use crate::{MlErr, Result, error::check_size};

#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    beta1_t: f32,
    beta2_t: f32,
    v: Box<[f32]>,
    s: Box<[f32]>,
    epsilon: f32,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    ///
    /// # Returns
    /// A new `Adam` instance.
    pub fn new(len: usize, learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            beta1_t: 1.,
            beta2_t: 1.,
            v: vec![0.; len].into_boxed_slice(),
            s: vec![0.; len].into_boxed_slice(),
            epsilon,
        }
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_size("gradient", grad.len(), params.len())?;
        check_size("adam moments", self.v.len(), params.len())?;

        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = *self;

        self.beta1_t *= b1;
        self.beta2_t *= b2;

        let bc1 = 1. - self.beta1_t;
        let bc2 = 1. - self.beta2_t;
        let step_size = lr * (bc2.sqrt() / bc1);

        params
            .iter_mut()
            .zip(grad)
            .zip(self.v.iter_mut())
            .zip(self.s.iter_mut())
            .for_each(|(((p, g), v), s)| {
                *v = b1 * *v + (1. - b1) * g;
                *s = b2 * *s + (1. - b2) * g.powi(2);
                *p -= step_size * *v / (s.sqrt() + eps);
            });

        Ok(())
    }

    fn state(&self) -> OptimizerState {
        OptimizerState::Adam {
            beta1_t: self.beta1_t,
            beta2_t: self.beta2_t,
            v: self.v.clone(),
            s: self.s.clone(),
        }
    }

    fn load_state(&mut self, state: &OptimizerState) -> Result<()> {
        let OptimizerState::Adam {
            beta1_t,
            beta2_t,
            v,
            s,
        } = state
        else {
            return Err(MlErr::StateMismatch {
                expected: "adam",
                got: state.kind(),
            });
        };

        check_size("adam moments", v.len(), self.v.len())?;
        check_size("adam moments", s.len(), self.s.len())?;

        self.beta1_t = *beta1_t;
        self.beta2_t = *beta2_t;
        self.v.copy_from_slice(v);
        self.s.copy_from_slice(s);
        Ok(())
    }
}
