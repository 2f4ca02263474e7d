//! Transition rules and the immutable table that holds them.

use crate::core::{Guard, State};
use crate::engine::error::RuleError;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Type alias for rule functions.
/// A rule computes the new state from the previous state and call context.
pub type RuleFn<S, C> = Arc<dyn Fn(&S, &C) -> Result<S, RuleError> + Send + Sync>;

pub(crate) fn rule_fn<S, C, F>(f: F) -> RuleFn<S, C>
where
    S: State,
    F: Fn(&S, &C) -> Result<S, RuleError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A single legal transition: `(from, name) -> to`.
pub struct Rule<S: State, C> {
    pub from: S::Shape,
    pub name: String,
    pub to: S::Shape,
    pub guard: Option<Guard<S, C>>,
    pub compute: RuleFn<S, C>,
}

impl<S: State, C> Rule<S, C> {
    /// Check if the guard, if any, lets this rule fire (pure)
    pub fn can_fire(&self, current: &S, context: &C) -> bool {
        self.guard
            .as_ref()
            .is_none_or(|g| g.check(current, context))
    }

    /// Compute the new state
    pub fn apply(&self, current: &S, context: &C) -> Result<S, RuleError> {
        (self.compute)(current, context)
    }
}

impl<S: State, C> Clone for Rule<S, C> {
    fn clone(&self) -> Self {
        Self {
            from: self.from,
            name: self.name.clone(),
            to: self.to,
            guard: self.guard.clone(),
            compute: Arc::clone(&self.compute),
        }
    }
}

/// Immutable set of rules for one state type, grouped by source shape.
///
/// Built once through
/// [`TransitionTableBuilder`](crate::builder::TransitionTableBuilder) and
/// shared read-only afterwards. A `(shape, name)` pair without a rule means
/// the transition is invalid from that shape.
pub struct TransitionTable<S: State, C> {
    rules: HashMap<S::Shape, Vec<Rule<S, C>>>,
}

impl<S: State, C> TransitionTable<S, C> {
    /// Only the builder creates tables, after validation.
    pub(crate) fn from_rules(rules: Vec<Rule<S, C>>) -> Self {
        let mut grouped: HashMap<S::Shape, Vec<Rule<S, C>>> = HashMap::new();
        for rule in rules {
            grouped.entry(rule.from).or_default().push(rule);
        }
        Self { rules: grouped }
    }

    pub fn lookup(&self, from: S::Shape, name: &str) -> Option<&Rule<S, C>> {
        self.rules
            .get(&from)
            .and_then(|rules| rules.iter().find(|rule| rule.name == name))
    }

    pub fn is_valid(&self, from: S::Shape, name: &str) -> bool {
        self.lookup(from, name).is_some()
    }

    /// Names of the transitions legal from a shape, in declaration order.
    pub fn transitions_from(&self, from: S::Shape) -> Vec<&str> {
        self.rules
            .get(&from)
            .map(|rules| rules.iter().map(|rule| rule.name.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shapes reachable from `start` by following declared targets.
    pub fn reachable_from(&self, start: S::Shape) -> HashSet<S::Shape> {
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(shape) = queue.pop_front() {
            for rule in self.rules.get(&shape).into_iter().flatten() {
                if seen.insert(rule.to) {
                    queue.push_back(rule.to);
                }
            }
        }

        seen
    }

    /// Shapes that can never be entered from `start`, in declaration order.
    pub fn unreachable_from(&self, start: S::Shape) -> Vec<S::Shape> {
        let reachable = self.reachable_from(start);
        S::shapes()
            .iter()
            .copied()
            .filter(|shape| !reachable.contains(shape))
            .collect()
    }
}
