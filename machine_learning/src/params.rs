use crate::{
    MlErr, Result,
    arch::{Model, ParamSpec},
    error::check_size,
    initialization::ParamGen,
    optimization::Optimizer,
};

/// The parameters of one model replica along with their gradient buffer.
///
/// Tensors are stored back to back in a single flat buffer following the order of `specs`.
#[derive(Debug, Clone)]
pub struct ParamStore {
    specs: Vec<ParamSpec>,
    params: Vec<f32>,
    grad: Vec<f32>,
}

impl ParamStore {
    /// Creates a new `ParamStore`.
    ///
    /// # Arguments
    /// * `specs` - The ordered tensors making up the parameters.
    /// * `params` - The initial flat parameters.
    ///
    /// # Returns
    /// A new store or an error if `params` doesn't match the layout.
    pub fn new(specs: Vec<ParamSpec>, params: Vec<f32>) -> Result<Self> {
        let expected = specs.iter().map(ParamSpec::len).sum();
        check_size("params", params.len(), expected)?;

        Ok(Self {
            grad: vec![0.; params.len()],
            specs,
            params,
        })
    }

    /// Creates a store with the layout of `model`, initialised by `param_gen`.
    pub fn for_model<M: Model + ?Sized>(model: &M, param_gen: &mut ParamGen) -> Result<Self> {
        let specs = model.param_specs();
        let params = param_gen.generate(&specs)?;
        Self::new(specs, params)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn specs(&self) -> &[ParamSpec] {
        &self.specs
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    pub fn grad(&self) -> &[f32] {
        &self.grad
    }

    /// Returns the parameters of the tensor called `name`, if any.
    pub fn tensor(&self, name: &str) -> Option<&[f32]> {
        let mut offset = 0;
        for spec in &self.specs {
            if spec.name == name {
                return Some(&self.params[offset..offset + spec.len()]);
            }

            offset += spec.len();
        }

        None
    }

    /// Gives simultaneous access to the layout, the parameters and the gradient.
    pub fn parts_mut(&mut self) -> (&[ParamSpec], &[f32], &mut [f32]) {
        (&self.specs, &self.params, &mut self.grad)
    }

    /// Overwrites every parameter.
    pub fn load_params(&mut self, params: &[f32]) -> Result<()> {
        check_size("params", params.len(), self.params.len())?;
        self.params.copy_from_slice(params);
        Ok(())
    }

    /// Overwrites the gradient buffer.
    pub fn set_grad(&mut self, grad: &[f32]) -> Result<()> {
        check_size("gradient", grad.len(), self.grad.len())?;
        self.grad.copy_from_slice(grad);
        Ok(())
    }

    pub fn zero_grad(&mut self) {
        self.grad.fill(0.);
    }

    /// Makes the optimizer take a step with the current gradient.
    pub fn step<O: Optimizer + ?Sized>(&mut self, optimizer: &mut O) -> Result<()> {
        optimizer.update_params(&self.grad, &mut self.params)
    }

    /// Fails unless `other` has exactly the same layout as this store.
    pub fn check_layout(&self, other: &[ParamSpec]) -> Result<()> {
        if self.specs.as_slice() != other {
            return Err(MlErr::InvalidConfig(format!(
                "parameter layouts differ: {} tensors against {}",
                self.specs.len(),
                other.len()
            )));
        }

        Ok(())
    }
}
