//! Builder for constructing transition rules.

use crate::builder::error::BuildError;
use crate::core::{Guard, State};
use crate::engine::table::rule_fn;
use crate::engine::{Rule, RuleError, RuleFn};

/// Builder for constructing rules with a fluent API.
///
/// # Example
///
/// ```
/// use tandem::builder::TransitionBuilder;
/// use tandem::core::State;
/// use tandem::state_enum;
///
/// state_enum! {
///     enum Job {
///         Queued,
///         Running(u32),
///     }
///     shape: JobShape
/// }
///
/// let rule = TransitionBuilder::<Job, u32>::new()
///     .from(JobShape::Queued)
///     .named("start")
///     .to(JobShape::Running)
///     .compute(|_, worker| Job::Running(*worker))
///     .build()
///     .unwrap();
///
/// assert_eq!(rule.apply(&Job::Queued, &7).unwrap(), Job::Running(7));
/// ```
pub struct TransitionBuilder<S: State, C> {
    from: Option<S::Shape>,
    name: Option<String>,
    to: Option<S::Shape>,
    guard: Option<Guard<S, C>>,
    compute: Option<RuleFn<S, C>>,
}

impl<S: State, C: 'static> TransitionBuilder<S, C> {
    /// Create a new rule builder.
    pub fn new() -> Self {
        Self {
            from: None,
            name: None,
            to: None,
            guard: None,
            compute: None,
        }
    }

    /// Set the source shape (required).
    pub fn from(mut self, shape: S::Shape) -> Self {
        self.from = Some(shape);
        self
    }

    /// Set the transition name (required).
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the target shape (required unless `goes_to` is used).
    pub fn to(mut self, shape: S::Shape) -> Self {
        self.to = Some(shape);
        self
    }

    /// Add a guard predicate (optional).
    pub fn guard(mut self, guard: Guard<S, C>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a guard using a closure (optional).
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&S, &C) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    /// Compute the new state from the previous state and context.
    pub fn compute<F>(mut self, f: F) -> Self
    where
        F: Fn(&S, &C) -> S + Send + Sync + 'static,
    {
        self.compute = Some(rule_fn(move |state, context| Ok(f(state, context))));
        self
    }

    /// Compute the new state, refusing the transition when the context
    /// does not allow one.
    pub fn try_compute<F>(mut self, f: F) -> Self
    where
        F: Fn(&S, &C) -> Result<S, RuleError> + Send + Sync + 'static,
    {
        self.compute = Some(rule_fn(f));
        self
    }

    /// Always move to a fixed state. Sets the target shape as well.
    pub fn goes_to(mut self, state: S) -> Self {
        self.to = Some(state.shape());
        self.compute = Some(rule_fn(move |_, _| Ok(state.clone())));
        self
    }

    /// Build the rule.
    pub fn build(self) -> Result<Rule<S, C>, BuildError> {
        let from = self.from.ok_or(BuildError::MissingFromShape)?;
        let name = self.name.ok_or(BuildError::MissingName)?;
        let to = self
            .to
            .ok_or_else(|| BuildError::MissingToShape { name: name.clone() })?;
        let compute = self
            .compute
            .ok_or_else(|| BuildError::MissingCompute { name: name.clone() })?;

        Ok(Rule {
            from,
            name,
            to,
            guard: self.guard,
            compute,
        })
    }
}

impl<S: State, C: 'static> Default for TransitionBuilder<S, C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_enum;

    state_enum! {
        enum TestState {
            Initial,
            Processing(u32),
            Complete,
        }
        shape: TestShape
        final: [Complete]
    }

    #[test]
    fn builder_validates_required_fields() {
        let result = TransitionBuilder::<TestState, ()>::new()
            .from(TestShape::Initial)
            .build();

        assert!(matches!(result, Err(BuildError::MissingName)));
    }

    #[test]
    fn builder_validates_missing_target() {
        let result = TransitionBuilder::<TestState, ()>::new()
            .from(TestShape::Initial)
            .named("start")
            .build();

        assert!(matches!(result, Err(BuildError::MissingToShape { name }) if name == "start"));
    }

    #[test]
    fn builder_validates_missing_compute() {
        let result = TransitionBuilder::<TestState, ()>::new()
            .from(TestShape::Initial)
            .named("start")
            .to(TestShape::Processing)
            .build();

        assert!(matches!(result, Err(BuildError::MissingCompute { .. })));
    }

    #[test]
    fn goes_to_sets_target_shape() {
        let rule = TransitionBuilder::<TestState, ()>::new()
            .from(TestShape::Processing)
            .named("finish")
            .goes_to(TestState::Complete)
            .build()
            .unwrap();

        assert_eq!(rule.to, TestShape::Complete);
        assert_eq!(
            rule.apply(&TestState::Processing(1), &()).unwrap(),
            TestState::Complete
        );
    }

    #[test]
    fn compute_carries_payload_forward() {
        let rule = TransitionBuilder::<TestState, u32>::new()
            .from(TestShape::Processing)
            .named("advance")
            .to(TestShape::Processing)
            .compute(|state, step| match state {
                TestState::Processing(n) => TestState::Processing(n + step),
                other => other.clone(),
            })
            .build()
            .unwrap();

        assert_eq!(
            rule.apply(&TestState::Processing(2), &3).unwrap(),
            TestState::Processing(5)
        );
    }

    #[test]
    fn try_compute_can_refuse() {
        let rule = TransitionBuilder::<TestState, Option<u32>>::new()
            .from(TestShape::Initial)
            .named("start")
            .to(TestShape::Processing)
            .try_compute(|_, worker| {
                worker
                    .map(TestState::Processing)
                    .ok_or_else(|| RuleError::new("no worker"))
            })
            .build()
            .unwrap();

        assert!(rule.apply(&TestState::Initial, &None).is_err());
        assert_eq!(
            rule.apply(&TestState::Initial, &Some(4)).unwrap(),
            TestState::Processing(4)
        );
    }

    #[test]
    fn transition_builder_with_guard() {
        let rule = TransitionBuilder::<TestState, ()>::new()
            .from(TestShape::Processing)
            .named("finish")
            .when(|s: &TestState, _: &()| matches!(s, TestState::Processing(n) if *n >= 10))
            .goes_to(TestState::Complete)
            .build()
            .unwrap();

        assert!(!rule.can_fire(&TestState::Processing(3), &()));
        assert!(rule.can_fire(&TestState::Processing(10), &()));
    }
}
