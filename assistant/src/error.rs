//! Errors for function validation and dispatch.

use thiserror::Error;

/// Why a model-requested function call could not run.
///
/// These never abort the turn: dispatch converts each into an error-shaped
/// [`shop_store::FunctionOutcome`] so the model can explain the problem to
/// the user.
#[derive(Debug, Error)]
pub enum FunctionError {
    /// Required argument missing or an argument of the wrong type.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The function needs an identified customer and the session has none.
    #[error("function {0} requires a signed-in customer")]
    Unauthorized(String),

    /// The model asked for a function that is not registered.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// The function ran but its backing lookup failed.
    #[error("function backend error: {0}")]
    Backend(String),
}
