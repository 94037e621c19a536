use ndarray::{Array2, ArrayView1, ArrayView2};

use super::super::{ParamSpec, activations::ActFn};
use crate::{MlErr, Result, error::check_size};

/// A fully connected layer, `a = act_fn(x · w + b)`.
///
/// The weights are laid out row-major with shape `(inputs, outputs)` followed by the
/// `outputs` biases.
#[derive(Debug, Clone)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    size: usize,
}

impl Dense {
    /// Creates a new `Dense` layer.
    ///
    /// # Arguments
    /// * `dim` - The amount of inputs and outputs of the layer.
    /// * `act_fn` - An optional activation function applied to the output.
    ///
    /// # Returns
    /// A new `Dense` instance.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        Self {
            dim,
            act_fn,
            size: (dim.0 + 1) * dim.1,
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    /// Returns the weight and bias tensors of this layer named after `prefix`.
    pub fn param_specs(&self, prefix: &str) -> [ParamSpec; 2] {
        [
            ParamSpec::new(format!("{prefix}.weight"), vec![self.dim.0, self.dim.1]),
            ParamSpec::new(format!("{prefix}.bias"), vec![self.dim.1]),
        ]
    }

    /// Makes a forward pass through the layer.
    ///
    /// # Arguments
    /// * `params` - Exactly `size()` parameters.
    /// * `x` - The input batch, one sample per row.
    ///
    /// # Returns
    /// The activations of the layer or an error if any shape is off.
    pub fn forward(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_size("dense params", params.len(), self.size)?;
        check_size("dense inputs", x.ncols(), self.dim.0)?;

        let (w, b) = self.view_params(params)?;
        let mut z = x.dot(&w);
        z += &b;

        if let Some(act_fn) = self.act_fn {
            z.mapv_inplace(|z| act_fn.f(z));
        }

        Ok(z)
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        let (w_raw, b_raw) = params.split_at(self.size - self.dim.1);
        let shape_err = |_| MlErr::SizeMismatch {
            what: "dense weights",
            got: w_raw.len(),
            expected: self.dim.0 * self.dim.1,
        };

        let w = ArrayView2::from_shape(self.dim, w_raw).map_err(shape_err)?;
        let b = ArrayView1::from_shape(self.dim.1, b_raw).map_err(shape_err)?;
        Ok((w, b))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn forward_is_affine_without_act_fn() {
        let dense = Dense::new((2, 1), None);
        let params = [2., 3., 1.];
        let x = array![[1., 1.], [0., 2.]];

        let y = dense.forward(&params, x.view()).unwrap();
        assert_eq!(y, array![[6.], [7.]]);
    }

    #[test]
    fn forward_applies_act_fn() {
        let dense = Dense::new((1, 2), Some(ActFn::relu()));
        let params = [1., -1., 0., 0.];
        let x = array![[2.]];

        let y = dense.forward(&params, x.view()).unwrap();
        assert_eq!(y, array![[2., 0.]]);
    }

    #[test]
    fn forward_rejects_wrong_input_width() {
        let dense = Dense::new((3, 1), None);
        let params = [0.; 4];
        let x = array![[1., 2.]];

        assert!(dense.forward(&params, x.view()).is_err());
    }

    #[test]
    fn param_specs_follow_layout() {
        let dense = Dense::new((3, 2), None);
        let [w, b] = dense.param_specs("dense0");

        assert_eq!(w.name, "dense0.weight");
        assert_eq!(w.len() + b.len(), dense.size());
        assert_eq!(b.shape, [2]);
    }
}
