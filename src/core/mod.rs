//! Core state machine types.
//!
//! This module contains the pure vocabulary shared by every other part of
//! the crate:
//! - State definitions via the `State` trait
//! - Guard predicates for transition rules
//! - Transition events seen by observers

mod event;
mod guard;
mod state;

pub use event::{TransitionEvent, TransitionRecord};
pub use guard::Guard;
pub use state::State;
