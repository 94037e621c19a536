use ndarray::{Array2, ArrayView2};

use super::{Model, ParamSpec, layers::Layer};
use crate::{Result, error::check_size};

/// A sequential model: information flows forward through its layers, each one consuming its
/// own contiguous chunk of the flat parameters.
#[derive(Debug, Clone)]
pub struct Sequential {
    layers: Vec<Layer>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.layers.iter().map(Layer::size).sum()
    }

    fn param_specs(&self) -> Vec<ParamSpec> {
        self.layers
            .iter()
            .enumerate()
            .flat_map(|(i, layer)| layer.param_specs(i))
            .collect()
    }

    fn forward(&self, params: &[f32], x: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_size("model params", params.len(), self.size())?;

        let mut rest = params;
        let mut a = x.to_owned();

        for layer in &self.layers {
            let (chunk, tail) = rest.split_at(layer.size());
            a = layer.forward(chunk, a.view())?;
            rest = tail;
        }

        Ok(a)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::arch::activations::ActFn;

    fn two_layers() -> Sequential {
        Sequential::new([
            Layer::dense((2, 2), Some(ActFn::relu())),
            Layer::dense((2, 1), None),
        ])
    }

    #[test]
    fn size_adds_up_layers() {
        let model = two_layers();
        assert_eq!(model.size(), 6 + 3);
        assert_eq!(model.param_specs().len(), 4);
    }

    #[test]
    fn forward_chains_layers() {
        let model = two_layers();
        #[rustfmt::skip]
        let params = [
            1., 0., 0., 1., 0., -10., // identity + relu, second unit killed
            1., 1., 0.5,              // sum + bias
        ];
        let x = array![[3., 4.]];

        let y = model.forward(&params, x.view()).unwrap();
        assert_eq!(y, array![[3.5]]);
    }

    #[test]
    fn forward_rejects_wrong_param_count() {
        let model = two_layers();
        let x = array![[3., 4.]];
        assert!(model.forward(&[0.; 3], x.view()).is_err());
    }
}
