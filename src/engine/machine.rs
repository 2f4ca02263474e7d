//! State machine that applies table-driven transitions and dispatches
//! observer callbacks.

use crate::config::DispatchConfig;
use crate::core::{State, TransitionEvent, TransitionRecord};
use crate::engine::error::TransitionError;
use crate::engine::snapshot::MachineSnapshot;
use crate::engine::table::TransitionTable;
use crate::registry::{CallbackRegistry, DispatchReport, Observer, ObserverId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, ThreadId};
use tracing::{debug, trace};
use uuid::Uuid;

/// Identity of one machine instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MachineId(Uuid);

impl MachineId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct Current<S: State> {
    state: S,
    last: Option<TransitionRecord<S>>,
    count: u64,
}

/// Clears the dispatching marker even if a callback unwinds.
struct DispatchMarker<'a>(&'a Mutex<Option<ThreadId>>);

impl<'a> DispatchMarker<'a> {
    fn set(slot: &'a Mutex<Option<ThreadId>>) -> Self {
        *lock(slot) = Some(thread::current().id());
        Self(slot)
    }
}

impl Drop for DispatchMarker<'_> {
    fn drop(&mut self) {
        *lock(self.0) = None;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A single-writer state machine.
///
/// # Example
///
/// ```
/// use tandem::builder::{rule, TransitionTableBuilder};
/// use tandem::engine::StateMachine;
/// use tandem::state_enum;
///
/// state_enum! {
///     enum Door {
///         Closed,
///         Open,
///     }
///     shape: DoorShape
/// }
///
/// let table = TransitionTableBuilder::<Door, ()>::new()
///     .rule(rule(DoorShape::Closed, "open").goes_to(Door::Open))
///     .rule(rule(DoorShape::Open, "close").goes_to(Door::Closed))
///     .build()
///     .unwrap();
///
/// let door = StateMachine::new("door", Door::Closed, table);
/// door.transition("open", ()).unwrap();
/// assert_eq!(door.current_state(), Door::Open);
///
/// // Not legal from `Open`: nothing changes.
/// assert!(door.transition("open", ()).is_err());
/// assert_eq!(door.current_state(), Door::Open);
/// ```
pub struct StateMachine<S: State, C = ()> {
    id: MachineId,
    label: String,
    created_at: DateTime<Utc>,
    current: RwLock<Current<S>>,
    table: Arc<TransitionTable<S, C>>,
    callbacks: CallbackRegistry<S, C>,
    writer: Mutex<()>,
    dispatching: Mutex<Option<ThreadId>>,
}

impl<S: State, C: 'static> StateMachine<S, C> {
    /// Create a machine in `initial` with default dispatch settings.
    pub fn new(label: impl Into<String>, initial: S, table: Arc<TransitionTable<S, C>>) -> Self {
        Self::with_config(label, initial, table, DispatchConfig::default())
    }

    pub fn with_config(
        label: impl Into<String>,
        initial: S,
        table: Arc<TransitionTable<S, C>>,
        config: DispatchConfig,
    ) -> Self {
        let label = label.into();
        let id = MachineId::new();
        debug!(machine = %label, id = %id, initial = ?initial, "created state machine");

        Self {
            id,
            callbacks: CallbackRegistry::with_config(label.clone(), config),
            label,
            created_at: Utc::now(),
            current: RwLock::new(Current {
                state: initial,
                last: None,
                count: 0,
            }),
            table,
            writer: Mutex::new(()),
            dispatching: Mutex::new(None),
        }
    }

    pub fn id(&self) -> MachineId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The most recently applied state. Safe from any thread.
    pub fn current_state(&self) -> S {
        self.read(|current| current.state.clone())
    }

    pub fn current_shape(&self) -> S::Shape {
        self.read(|current| current.state.shape())
    }

    /// Check if machine is in a final state
    pub fn is_final(&self) -> bool {
        self.read(|current| current.state.is_final())
    }

    /// Number of transitions applied since creation.
    pub fn transition_count(&self) -> u64 {
        self.read(|current| current.count)
    }

    /// Whether the table has a rule for `name` from the current shape.
    /// Guards are not evaluated.
    pub fn can_transition(&self, name: &str) -> bool {
        self.table.is_valid(self.current_shape(), name)
    }

    /// Transition names legal from the current shape, in declaration order.
    pub fn available_transitions(&self) -> Vec<String> {
        self.table
            .transitions_from(self.current_shape())
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn table(&self) -> &Arc<TransitionTable<S, C>> {
        &self.table
    }

    /// Registry of callbacks run after each transition.
    pub fn callbacks(&self) -> &CallbackRegistry<S, C> {
        &self.callbacks
    }

    /// Register every interest declared by the observer's type.
    pub fn connect_object<O: Observer<S, C>>(&self, observer: &Arc<O>) -> ObserverId {
        self.callbacks.connect_object(observer)
    }

    fn read<T>(&self, f: impl FnOnce(&Current<S>) -> T) -> T {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        f(&current)
    }

    /// Apply the transition `name` with `context`.
    ///
    /// On success the new state is visible to readers before any callback
    /// runs, and every matching callback has run (or failed) by the time
    /// this returns. On error the state is unchanged and no callback ran.
    ///
    /// Calling this from inside one of this machine's own callbacks is
    /// refused with [`TransitionError::Reentrant`].
    pub fn transition(&self, name: &str, context: C) -> Result<DispatchReport, TransitionError> {
        if *lock(&self.dispatching) == Some(thread::current().id()) {
            return Err(TransitionError::Reentrant {
                name: name.to_string(),
            });
        }

        let _writer = lock(&self.writer);
        let from = self.current_state();

        let Some(rule) = self.table.lookup(from.shape(), name) else {
            debug!(
                machine = %self.label,
                from = %from.name(),
                transition = name,
                "no such transition"
            );
            return Err(TransitionError::InvalidTransition {
                from: from.name().to_string(),
                name: name.to_string(),
            });
        };

        if !rule.can_fire(&from, &context) {
            return Err(TransitionError::GuardRejected {
                from: from.name().to_string(),
                name: name.to_string(),
            });
        }

        let to = rule
            .apply(&from, &context)
            .map_err(|err| TransitionError::RuleFailed {
                from: from.name().to_string(),
                name: name.to_string(),
                reason: err.to_string(),
            })?;

        if to.shape() != rule.to {
            return Err(TransitionError::TargetMismatch {
                name: name.to_string(),
                expected: rule.to.to_string(),
                actual: to.name().to_string(),
            });
        }

        let event = TransitionEvent {
            from: &from,
            to: &to,
            name,
            context: &context,
        };

        {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            current.state = to.clone();
            current.last = Some(TransitionRecord::from_event(&event));
            current.count += 1;
        }
        trace!(
            machine = %self.label,
            from = ?from,
            to = ?to,
            transition = name,
            "applied transition"
        );

        let _marker = DispatchMarker::set(&self.dispatching);
        Ok(self.callbacks.dispatch(&event))
    }

    /// Point-in-time view of this machine.
    pub fn snapshot(&self) -> MachineSnapshot<S> {
        let (state, last_transition, transition_count) =
            self.read(|current| (current.state.clone(), current.last.clone(), current.count));

        MachineSnapshot {
            machine: self.id,
            label: self.label.clone(),
            created_at: self.created_at,
            taken_at: Utc::now(),
            shape: state.shape().to_string(),
            available_transitions: self
                .table
                .transitions_from(state.shape())
                .into_iter()
                .map(str::to_string)
                .collect(),
            state,
            transition_count,
            last_transition,
        }
    }
}

impl<S: State, C> fmt::Debug for StateMachine<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("StateMachine")
            .field("label", &self.label)
            .field("id", &self.id)
            .field("state", &current.state)
            .field("transitions", &current.count)
            .finish()
    }
}
