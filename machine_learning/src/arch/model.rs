use ndarray::{Array2, ArrayView2};

use crate::Result;

/// The name and shape of one of the parameter tensors of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub shape: Vec<usize>,
}

impl ParamSpec {
    /// Creates a new `ParamSpec`.
    ///
    /// # Arguments
    /// * `name` - A human readable identifier, unique within the model.
    /// * `shape` - The dimensions of the tensor.
    pub fn new(name: impl Into<String>, shape: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }

    /// Returns the amount of scalars in this tensor.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The capability every model shares: a layout of named parameter tensors and a forward pass.
///
/// A model doesn't own its parameters, they are handed to `forward` as a flat slice laid out
/// in the order given by `param_specs`. This lets many participants share the same
/// architecture while each one owns its own replica of the parameters.
pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize {
        self.param_specs().iter().map(ParamSpec::len).sum()
    }

    /// Returns the ordered list of parameter tensors of the model.
    fn param_specs(&self) -> Vec<ParamSpec>;

    /// Makes a forward pass through the model.
    ///
    /// # Arguments
    /// * `params` - The flat parameters of the model, `size()` long.
    /// * `x` - A batch of inputs, one sample per row.
    ///
    /// # Returns
    /// The prediction for every row of `x` or an error if the shapes don't match.
    fn forward(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>>;
}

impl<M: Model + ?Sized> Model for Box<M> {
    fn size(&self) -> usize {
        (**self).size()
    }

    fn param_specs(&self) -> Vec<ParamSpec> {
        (**self).param_specs()
    }

    fn forward(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        (**self).forward(params, x)
    }
}
