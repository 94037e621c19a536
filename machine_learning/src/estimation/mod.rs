mod estimator;
mod perturbation;
mod replay;

pub use estimator::{DifferenceMethod, RandomGradientEstimator};
pub use perturbation::PerturbationSource;
pub use replay::update_model_given_seeds;
