use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug, Clone, PartialEq)]
pub enum MlErr {
    /// A shape invariant was violated (e.g. mismatched lengths).
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// A component was built with values it can't work with.
    InvalidConfig(String),
    /// A snapshot was restored into a component of a different kind.
    StateMismatch {
        expected: &'static str,
        got: &'static str,
    },
    /// A dataset without a single sample.
    EmptyDataset,
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch for {what}, got {got} and expected {expected}"
            ),
            MlErr::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            MlErr::StateMismatch { expected, got } => write!(
                f,
                "Tried to load a {got} optimizer state into a {expected} optimizer"
            ),
            MlErr::EmptyDataset => write!(f, "the dataset doesn't contain any sample"),
        }
    }
}

impl Error for MlErr {}

/// Fails with `MlErr::SizeMismatch` whenever `got` differs from `expected`.
pub(crate) fn check_size(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(MlErr::SizeMismatch {
            what,
            got,
            expected,
        });
    }

    Ok(())
}
