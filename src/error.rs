use std::path::PathBuf;
use thiserror::Error;

/// Malformed or inconsistent inputs, detected before any model is built
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Control horizon must contain at least one step")]
    HorizonEmpty,

    #[error("Series '{series}' has {len} values but the horizon needs {horizon}")]
    SeriesTooShort {
        series: &'static str,
        len: usize,
        horizon: usize,
    },

    #[error("Series '{series}' contains a non-finite value at step {index}")]
    NonFiniteValue { series: &'static str, index: usize },

    #[error("PV forecast is negative at step {index}")]
    NegativePv { index: usize },

    #[error("Request declares {declared} vehicles but provides {provided}")]
    VehicleCountMismatch { declared: usize, provided: usize },

    #[error("Vehicle {index} is invalid: {reason}")]
    InvalidVehicle { index: usize, reason: String },

    #[error("Grid capacity must be finite and non-negative, got {0}")]
    InvalidGridCapacity(f64),

    #[error("Invalid model parameter: {0}")]
    InvalidParameter(String),

    #[error("Malformed plan request: {0}")]
    MalformedRequest(String),

    #[error("Unknown solver '{0}'")]
    UnknownSolver(String),

    #[error("Solver '{0}' is not compiled into this build")]
    SolverUnavailable(String),
}

/// Every way a planning invocation can fail
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Charging model is infeasible")]
    Infeasible { artifact: Option<PathBuf> },

    #[error("Solver failed: {status}")]
    SolverFailure {
        status: String,
        artifact: Option<PathBuf>,
    },

    #[error("Inconsistent solution: {0}")]
    Extraction(String),
}

impl PlannerError {
    /// Path of the diagnostic LP dump, if one was written
    pub fn artifact(&self) -> Option<&PathBuf> {
        match self {
            PlannerError::Infeasible { artifact } | PlannerError::SolverFailure { artifact, .. } => {
                artifact.as_ref()
            }
            _ => None,
        }
    }
}
