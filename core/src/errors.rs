//! Error types for the resilience policy runtime

use std::error::Error;
use std::fmt;

/// Errors raised by policy registration and lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A policy with this name is already registered
    DuplicatePolicy { name: String },
    /// No policy was registered under this name
    UnknownPolicy { name: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicatePolicy { name } => {
                write!(f, "Policy '{}' is already registered", name)
            }
            RegistryError::UnknownPolicy { name } => {
                write!(f, "No policy registered under '{}'", name)
            }
        }
    }
}

impl Error for RegistryError {}

/// Why an admitted or rejected call did not produce the operation's value
///
/// This is what fallbacks receive. `Timeout` and `Rejected` are synthesized
/// by the engine and never reflect the wrapped operation's own result.
#[derive(Debug)]
pub enum FailureCause<E = Box<dyn Error + Send + Sync>> {
    /// The wrapped operation returned an error
    Operation(E),
    /// The call exceeded the policy's time limit
    Timeout { limit_secs: f64 },
    /// The breaker refused the call without invoking the operation
    Rejected {
        circuit: String,
        state: &'static str,
    },
    /// The operation panicked instead of returning
    Panicked,
}

impl<E> FailureCause<E> {
    /// Short cause tag, available without any bound on `E`
    pub fn label(&self) -> &'static str {
        match self {
            FailureCause::Operation(_) => "operation_error",
            FailureCause::Timeout { .. } => "timeout",
            FailureCause::Rejected { .. } => "rejected",
            FailureCause::Panicked => "panic",
        }
    }
}

impl<E: fmt::Display> fmt::Display for FailureCause<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Operation(e) => write!(f, "Operation failed: {}", e),
            FailureCause::Timeout { limit_secs } => {
                write!(f, "Call timed out after {}s", limit_secs)
            }
            FailureCause::Rejected { circuit, state } => {
                write!(f, "Circuit '{}' rejected the call while {}", circuit, state)
            }
            FailureCause::Panicked => write!(f, "Operation panicked"),
        }
    }
}

impl<E: Error + 'static> Error for FailureCause<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FailureCause::Operation(e) => Some(e),
            _ => None,
        }
    }
}

/// Errors that escape `run`
///
/// Operation failures, timeouts and rejections never appear here; they are
/// absorbed into the fallback's return value. Only registry misuse and a
/// failing fallback reach the caller.
#[derive(Debug)]
pub enum RunError<E = Box<dyn Error + Send + Sync>> {
    /// No policy was registered under this name
    UnknownPolicy { name: String },
    /// The fallback itself failed; there is no second-level fallback
    Fallback { circuit: String, error: E },
}

impl<E: fmt::Display> fmt::Display for RunError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::UnknownPolicy { name } => {
                write!(f, "No policy registered under '{}'", name)
            }
            RunError::Fallback { circuit, error } => {
                write!(f, "Circuit '{}' fallback failed: {}", circuit, error)
            }
        }
    }
}

impl<E: Error + 'static> Error for RunError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RunError::Fallback { error, .. } => Some(error),
            _ => None,
        }
    }
}
