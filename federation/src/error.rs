use std::{error::Error, fmt, io};

use machine_learning::MlErr;

/// The result type used across the federation crate.
pub type Result<T> = std::result::Result<T, FederationErr>;

/// All errors that can occur while setting up or running a federation.
#[derive(Debug)]
pub enum FederationErr {
    /// A model, estimator or optimizer operation failed.
    Ml(MlErr),
    /// Invalid configuration, caught before any training happens.
    Config(String),
    /// A round was requested out of order.
    OutOfOrderRound { got: usize, last: usize },
    /// Reading a configuration or dataset file failed.
    Io(io::Error),
    /// A configuration file isn't valid JSON for `CezoConfig`.
    Json(serde_json::Error),
}

impl fmt::Display for FederationErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ml(e) => write!(f, "{e}"),
            Self::Config(msg) => write!(f, "invalid config: {msg}"),
            Self::OutOfOrderRound { got, last } => {
                write!(f, "round {got} requested after round {last}")
            }
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Json(e) => write!(f, "malformed config: {e}"),
        }
    }
}

impl Error for FederationErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Ml(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlErr> for FederationErr {
    fn from(e: MlErr) -> Self {
        Self::Ml(e)
    }
}

impl From<io::Error> for FederationErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for FederationErr {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
