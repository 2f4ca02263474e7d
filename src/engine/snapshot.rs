//! Serializable view of a machine for diagnostics.

use crate::core::{State, TransitionRecord};
use crate::engine::machine::MachineId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time view of a state machine.
///
/// Snapshots are for logs and debugging output. They hold the current
/// state and the most recent transition only; nothing is persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct MachineSnapshot<S: State> {
    /// Machine identity
    pub machine: MachineId,

    /// Human-readable machine label
    pub label: String,

    /// When the machine was created
    pub created_at: DateTime<Utc>,

    /// When this snapshot was taken
    pub taken_at: DateTime<Utc>,

    /// Current state
    pub state: S,

    /// Shape of the current state
    pub shape: String,

    /// Number of transitions applied so far
    pub transition_count: u64,

    /// Most recently applied transition
    pub last_transition: Option<TransitionRecord<S>>,

    /// Transition names legal from the current shape
    pub available_transitions: Vec<String>,
}

impl<S: State> MachineSnapshot<S> {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
