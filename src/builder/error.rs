//! Build errors for transition rules and tables.

use std::fmt;
use thiserror::Error;

/// Problems found while building a rule or validating a table.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    #[error("No transitions defined. Add at least one rule")]
    NoTransitions,

    #[error("Rule source shape not specified. Call .from(shape)")]
    MissingFromShape,

    #[error("Rule name not specified. Call .named(name)")]
    MissingName,

    #[error("Target shape of '{name}' not specified. Call .to(shape) or .goes_to(state)")]
    MissingToShape { name: String },

    #[error("Rule '{name}' computes nothing. Call .compute(f) or .goes_to(state)")]
    MissingCompute { name: String },

    #[error("Rule '{name}' is declared twice from '{from}'")]
    DuplicateRule { from: String, name: String },

    #[error("Shape '{shape}' is not final but has no outgoing transitions")]
    DeadEnd { shape: String },
}

/// Every problem found in a transition table, in the order they were found.
#[derive(Debug, Clone, Error, PartialEq)]
pub struct TableError {
    pub errors: Vec<BuildError>,
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid transition table ({} problem(s))", self.errors.len())?;
        for error in &self.errors {
            write!(f, "; {}", error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_error_lists_every_problem() {
        let error = TableError {
            errors: vec![
                BuildError::NoTransitions,
                BuildError::DeadEnd {
                    shape: "Waiting".to_string(),
                },
            ],
        };

        let message = error.to_string();
        assert!(message.starts_with("invalid transition table (2 problem(s))"));
        assert!(message.contains("Add at least one rule"));
        assert!(message.contains("'Waiting'"));
    }
}
