//! The state machine engine.
//!
//! A [`StateMachine`] holds the current state, an immutable
//! [`TransitionTable`], and a [`CallbackRegistry`](crate::registry::CallbackRegistry).
//! Applying a transition looks up the rule for `(current shape, name)`,
//! computes the new state, swaps it in, and then runs every matching
//! callback before returning.
//!
//! # Concurrency
//!
//! `current_state()` may be called from any thread. Transitions on one
//! machine are serialized by a writer lock, so no two are ever applied at
//! the same time; the intended use is to apply them all on one owner
//! thread, reached from workers through [`crate::bridge`].

mod error;
mod machine;
mod snapshot;
pub(crate) mod table;

pub use error::{RuleError, TransitionError};
pub use machine::{MachineId, StateMachine};
pub use snapshot::MachineSnapshot;
pub use table::{Rule, RuleFn, TransitionTable};
