use ndarray::{Array2, ArrayView2};

use super::Dense;
use crate::{
    Result,
    arch::{ParamSpec, activations::ActFn},
};

/// A single layer of a `Sequential` model.
#[derive(Debug, Clone)]
pub enum Layer {
    Dense(Dense),
}

impl Layer {
    pub fn dense(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self::Dense(Dense::new(dim, act_fn))
    }

    pub fn size(&self) -> usize {
        match self {
            Self::Dense(l) => l.size(),
        }
    }

    /// Returns the named parameter tensors of the layer at position `index`.
    pub fn param_specs(&self, index: usize) -> Vec<ParamSpec> {
        match self {
            Self::Dense(l) => l.param_specs(&format!("dense{index}")).into(),
        }
    }

    pub fn forward(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        match self {
            Self::Dense(l) => l.forward(params, x),
        }
    }
}
