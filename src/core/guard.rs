//! Guard predicates for controlling state transitions.
//!
//! A guard is an extra pre-condition attached to a single transition rule.
//! It sees the current state and the call context, and when it returns
//! `false` the transition is refused exactly like a missing rule: the state
//! is left alone and no callbacks fire.

use super::state::State;
use std::sync::Arc;

/// Pure predicate that determines if a rule may fire.
///
/// # Example
///
/// ```rust
/// use tandem::core::Guard;
/// use tandem::state_enum;
///
/// state_enum! {
///     enum Volume {
///         Muted,
///         Level(u8),
///     }
///     shape: VolumeShape
/// }
///
/// let below_max = Guard::new(|s: &Volume, step: &u8| match s {
///     Volume::Level(level) => level.saturating_add(*step) <= 10,
///     Volume::Muted => true,
/// });
///
/// assert!(below_max.check(&Volume::Level(4), &2));
/// assert!(!below_max.check(&Volume::Level(9), &2));
/// ```
pub struct Guard<S: State, C> {
    predicate: Arc<dyn Fn(&S, &C) -> bool + Send + Sync>,
}

impl<S: State, C> Guard<S, C> {
    /// Create a guard from a pure predicate function.
    ///
    /// The predicate must be deterministic and thread-safe (Send + Sync).
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&S, &C) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
        }
    }

    /// Check if the guard allows the rule to fire from this state.
    pub fn check(&self, state: &S, context: &C) -> bool {
        (self.predicate)(state, context)
    }
}

impl<S: State, C> Clone for Guard<S, C> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}
