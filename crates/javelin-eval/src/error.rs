//! Runtime error types for the Javelin evaluator.

use thiserror::Error;

use crate::value::Value;

/// Evaluation error.
///
/// Everything except [`EvalError::Exception`] is a fault of the runtime or of
/// a program that slipped past the static phase, and aborts the current
/// execution context. `Exception` carries a thrown program value up to the
/// nearest enclosing `try` that catches it.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// Invalid operand combination for an operator or library call.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    /// A name with no binding at run time.
    #[error("unresolved name: {0}")]
    UnresolvedName(String),
    /// The class registry could not be built.
    #[error("load error: {0}")]
    Load(String),
    /// Gas exhaustion
    #[error("gas exhausted")]
    GasExhausted,
    /// A program-level exception in flight.
    #[error("exception thrown")]
    Exception(Value),
    #[error("thread error: {0}")]
    Thread(String),
    /// Generic runtime error
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
