//! Errors reported by the engine when a transition is refused.

use thiserror::Error;

/// Why a requested transition was not applied.
///
/// Every variant leaves the machine in its prior state with no callbacks
/// fired. All of them are recoverable.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransitionError {
    #[error("Invalid transition '{name}' from state '{from}'")]
    InvalidTransition { from: String, name: String },

    #[error("Guard rejected transition '{name}' from state '{from}'")]
    GuardRejected { from: String, name: String },

    #[error("Transition '{name}' from state '{from}' failed: {reason}")]
    RuleFailed {
        from: String,
        name: String,
        reason: String,
    },

    #[error("Transition '{name}' produced state '{actual}', declared target is '{expected}'")]
    TargetMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Transition '{name}' requested while the machine is dispatching callbacks")]
    Reentrant { name: String },
}

impl TransitionError {
    /// Whether the error means no rule exists for the request.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }
}

/// Error returned by a rule function that cannot compute a new state from
/// the context it was given.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{0}")]
pub struct RuleError(pub String);

impl RuleError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}
