//! Builder for constructing transition tables.

use crate::builder::error::{BuildError, TableError};
use crate::builder::transition::TransitionBuilder;
use crate::core::State;
use crate::engine::{Rule, TransitionTable};
use std::collections::HashSet;
use std::sync::Arc;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Builder for transition tables with a fluent API.
///
/// Problems in individual rules are collected rather than returned early,
/// so `build()` reports everything wrong with the table at once.
pub struct TransitionTableBuilder<S: State, C> {
    rules: Vec<Rule<S, C>>,
    errors: Vec<BuildError>,
}

impl<S: State, C: 'static> TransitionTableBuilder<S, C> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Add a rule using a builder.
    /// A builder that fails is reported by `build()`.
    pub fn rule(mut self, builder: TransitionBuilder<S, C>) -> Self {
        match builder.build() {
            Ok(rule) => self.rules.push(rule),
            Err(error) => self.errors.push(error),
        }
        self
    }

    /// Add a pre-built rule.
    pub fn add_rule(mut self, rule: Rule<S, C>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add multiple rules at once.
    pub fn rules(mut self, rules: Vec<Rule<S, C>>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Check the table, accumulating ALL problems.
    ///
    /// - rules that failed to build
    /// - an empty table
    /// - the same `(shape, name)` declared twice
    /// - non-final shapes with no way out
    pub fn validate(&self) -> Validation<(), NonEmptyVec<BuildError>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<BuildError>>> = Vec::new();

        for error in &self.errors {
            checks.push(Validation::fail(error.clone()));
        }

        if self.rules.is_empty() && self.errors.is_empty() {
            checks.push(Validation::fail(BuildError::NoTransitions));
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            let check = if seen.insert((rule.from, rule.name.as_str())) {
                Validation::success(())
            } else {
                Validation::fail(BuildError::DuplicateRule {
                    from: rule.from.to_string(),
                    name: rule.name.clone(),
                })
            };
            checks.push(check);
        }

        for shape in S::shapes() {
            let has_exit = self.rules.iter().any(|rule| rule.from == *shape);
            let check = if has_exit || S::is_final_shape(*shape) {
                Validation::success(())
            } else {
                Validation::fail(BuildError::DeadEnd {
                    shape: shape.to_string(),
                })
            };
            checks.push(check);
        }

        Validation::all_vec(checks).map(|_| ())
    }

    /// Build the table.
    /// Returns every problem found if the table is invalid.
    pub fn build(self) -> Result<Arc<TransitionTable<S, C>>, TableError> {
        match self.validate() {
            Validation::Success(_) => Ok(Arc::new(TransitionTable::from_rules(self.rules))),
            Validation::Failure(errors) => Err(TableError {
                errors: errors.iter().cloned().collect(),
            }),
        }
    }
}

impl<S: State, C: 'static> Default for TransitionTableBuilder<S, C> {
    fn default() -> Self {
        Self::new()
    }
}
