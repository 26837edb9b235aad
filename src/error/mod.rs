use diffsol::error::DiffsolError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PkError {
    /// A rate, volume or dose was non-positive or not finite
    #[error("Invalid value for parameter '{name}': {value}")]
    InvalidParameter { name: String, value: f64 },

    #[error("There can only be one subcutaneous compartment")]
    DuplicateCompartment,

    #[error("A compartment named '{0}' already exists")]
    DuplicateLabel(String),

    #[error("Invalid initial state: {0}")]
    InvalidInitialState(String),

    #[error("Invalid evaluation time points: {0}")]
    InvalidTimePoints(String),

    /// The integrator could not produce a trajectory
    #[error("Integration failed: {0}")]
    IntegrationFailure(String),

    #[error("Unknown compartment '{0}'")]
    UnknownCompartment(String),

    #[error("Failed to parse model configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to initialise logging: {0}")]
    Logger(String),
}

impl PkError {
    pub(crate) fn invalid(name: impl Into<String>, value: f64) -> Self {
        PkError::InvalidParameter {
            name: name.into(),
            value,
        }
    }
}

impl From<DiffsolError> for PkError {
    fn from(err: DiffsolError) -> Self {
        PkError::IntegrationFailure(err.to_string())
    }
}

/// Checks that `value` is finite and strictly positive.
pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<f64, PkError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(PkError::invalid(name, value))
    }
}
