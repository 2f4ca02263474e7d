//! Transition events handed to observers, and the owned record kept for
//! diagnostics.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A transition that has just been applied.
///
/// Observers receive this by reference during dispatch. It borrows from
/// the engine for the duration of the dispatch only.
#[derive(Debug)]
pub struct TransitionEvent<'a, S: State, C> {
    /// The state the machine left
    pub from: &'a S,
    /// The state the machine is now in
    pub to: &'a S,
    /// Name of the transition that was requested
    pub name: &'a str,
    /// Call context passed to the transition
    pub context: &'a C,
}

impl<'a, S: State, C> TransitionEvent<'a, S, C> {
    /// The edge this transition traversed, as a pair of shapes.
    pub fn edge(&self) -> (S::Shape, S::Shape) {
        (self.from.shape(), self.to.shape())
    }

    /// Whether the transition left the machine in the same shape.
    pub fn is_self_loop(&self) -> bool {
        self.from.shape() == self.to.shape()
    }
}

impl<'a, S: State, C> Clone for TransitionEvent<'a, S, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, S: State, C> Copy for TransitionEvent<'a, S, C> {}

/// Record of a single applied transition.
///
/// Only the most recent record is kept per machine; there is no history.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct TransitionRecord<S: State> {
    /// The state being transitioned from
    pub from: S,
    /// The state being transitioned to
    pub to: S,
    /// Name of the transition
    pub name: String,
    /// When the transition was applied
    pub timestamp: DateTime<Utc>,
}

impl<S: State> TransitionRecord<S> {
    pub fn from_event<C>(event: &TransitionEvent<'_, S, C>) -> Self {
        Self {
            from: event.from.clone(),
            to: event.to.clone(),
            name: event.name.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_enum;

    state_enum! {
        enum Light {
            Off,
            On(u8),
        }
        shape: LightShape
    }

    #[test]
    fn edge_reports_shapes() {
        let from = Light::Off;
        let to = Light::On(80);
        let event = TransitionEvent {
            from: &from,
            to: &to,
            name: "switch_on",
            context: &(),
        };

        assert_eq!(event.edge(), (LightShape::Off, LightShape::On));
        assert!(!event.is_self_loop());
    }

    #[test]
    fn payload_change_is_a_self_loop() {
        let from = Light::On(10);
        let to = Light::On(90);
        let event = TransitionEvent {
            from: &from,
            to: &to,
            name: "dim",
            context: &(),
        };

        assert!(event.is_self_loop());
    }

    #[test]
    fn record_copies_event() {
        let from = Light::Off;
        let to = Light::On(1);
        let event = TransitionEvent {
            from: &from,
            to: &to,
            name: "switch_on",
            context: &(),
        };

        let record = TransitionRecord::from_event(&event);
        assert_eq!(record.from, Light::Off);
        assert_eq!(record.to, Light::On(1));
        assert_eq!(record.name, "switch_on");

        let json = serde_json::to_string(&record).unwrap();
        let back: TransitionRecord<Light> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.to, Light::On(1));
    }
}
