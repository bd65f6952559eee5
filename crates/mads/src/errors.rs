use thiserror::Error;

/// A result type for MADS optimization
pub type Result<T> = std::result::Result<T, MadsError>;

/// An error for MADS optimizer
#[derive(Error, Debug)]
pub enum MadsError {
    /// When the optimizer is misconfigured (bounds, dimensions, method name, ...)
    #[error("Invalid configuration: {0}")]
    InvalidConfigError(String),
    /// When the initial point does not satisfy the constraints
    #[error("Infeasible start: initial point violates constraint #{0}")]
    InfeasibleStartError(usize),
    /// When a numerical guard is hit
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    /// When error occurs within the argmin framework
    #[error(transparent)]
    ArgminError(#[from] argmin::core::Error),
}

impl MadsError {
    /// Recover a [`MadsError`] raised from within the solver and carried
    /// through the argmin executor as an opaque error.
    pub(crate) fn from_argmin(err: argmin::core::Error) -> Self {
        match err.downcast::<MadsError>() {
            Ok(err) => err,
            Err(err) => MadsError::ArgminError(err),
        }
    }
}
