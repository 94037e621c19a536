use std::fmt;

/// An element-wise activation function applied at the output of a layer.
///
/// Only the function itself is needed, models here are never differentiated analytically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActFn {
    Sigmoid { amp: f32 },
    Relu,
    Tanh,
}

use ActFn::*;

impl ActFn {
    /// Returns a sigmoid activation scaled by `amp`.
    pub fn sigmoid(amp: f32) -> Self {
        Sigmoid { amp }
    }

    pub fn relu() -> Self {
        Relu
    }

    pub fn tanh() -> Self {
        Tanh
    }

    /// Evaluates the activation at `z`.
    pub fn f(&self, z: f32) -> f32 {
        match *self {
            Sigmoid { amp } => amp / (1. + (-z).exp()),
            Relu => z.max(0.),
            Tanh => z.tanh(),
        }
    }
}

impl fmt::Display for ActFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sigmoid { amp } => write!(f, "sigmoid(amp={amp})"),
            Relu => f.write_str("relu"),
            Tanh => f.write_str("tanh"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_centered_at_half_amp() {
        let act_fn = ActFn::sigmoid(2.);
        assert_eq!(act_fn.f(0.), 1.);
        assert!(act_fn.f(50.) > 1.99);
        assert!(act_fn.f(-50.) < 0.01);
    }

    #[test]
    fn relu_clips_negatives() {
        assert_eq!(ActFn::relu().f(-3.), 0.);
        assert_eq!(ActFn::relu().f(3.), 3.);
    }

    #[test]
    fn tanh_is_odd() {
        let act_fn = ActFn::tanh();
        assert_eq!(act_fn.f(0.5), -act_fn.f(-0.5));
    }
}
