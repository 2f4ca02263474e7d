//! Observer objects and their declared interests.
//!
//! An observer type lists the states and edges it cares about once, as a
//! table of method pointers.
//! [`CallbackRegistry::connect_object`](super::CallbackRegistry::connect_object)
//! walks that table and registers one callback per entry.

use super::trigger::Trigger;
use crate::core::{State, TransitionEvent};

/// Method an observer exposes for one interest.
pub type Handler<O, S, C> = fn(&O, &TransitionEvent<'_, S, C>) -> anyhow::Result<()>;

/// One state or edge an observer wants to hear about.
pub struct Interest<O, S: State, C> {
    pub(crate) trigger: Trigger<S::Shape>,
    pub(crate) handler: Handler<O, S, C>,
}

impl<O, S: State, C> Interest<O, S, C> {
    /// Fire whenever the machine enters `shape`.
    pub fn entry(shape: S::Shape, handler: Handler<O, S, C>) -> Self {
        Self {
            trigger: Trigger::entry(shape),
            handler,
        }
    }

    /// Fire on `from -> to` by any transition name.
    pub fn edge(from: S::Shape, to: S::Shape, handler: Handler<O, S, C>) -> Self {
        Self {
            trigger: Trigger::edge(from, to),
            handler,
        }
    }

    /// Fire on `from -> to` by the named transition only.
    pub fn edge_named(
        from: S::Shape,
        to: S::Shape,
        name: impl Into<String>,
        handler: Handler<O, S, C>,
    ) -> Self {
        Self {
            trigger: Trigger::edge(from, to).named(name),
            handler,
        }
    }

    /// Fire on any edge into `to`, as an edge callback.
    pub fn edge_into(to: S::Shape, handler: Handler<O, S, C>) -> Self {
        Self {
            trigger: Trigger::edge_into(to),
            handler,
        }
    }

    pub fn trigger(&self) -> &Trigger<S::Shape> {
        &self.trigger
    }
}

/// A type whose instances observe a machine of state type `S` with call
/// context `C`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use tandem::core::TransitionEvent;
/// use tandem::registry::{CallbackRegistry, Interest, Observer};
/// use tandem::state_enum;
///
/// state_enum! {
///     enum Lamp {
///         Off,
///         On,
///     }
///     shape: LampShape
/// }
///
/// #[derive(Default)]
/// struct Counter {
///     switched_on: AtomicUsize,
/// }
///
/// impl Counter {
///     fn on_lit(&self, _event: &TransitionEvent<'_, Lamp, ()>) -> anyhow::Result<()> {
///         self.switched_on.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// impl Observer<Lamp, ()> for Counter {
///     fn interests() -> Vec<Interest<Self, Lamp, ()>> {
///         vec![Interest::entry(LampShape::On, Self::on_lit)]
///     }
/// }
///
/// let registry = CallbackRegistry::<Lamp, ()>::new("lamp");
/// let counter = Arc::new(Counter::default());
/// registry.connect_object(&counter);
///
/// registry.dispatch(&TransitionEvent {
///     from: &Lamp::Off,
///     to: &Lamp::On,
///     name: "switch",
///     context: &(),
/// });
/// assert_eq!(counter.switched_on.load(Ordering::SeqCst), 1);
/// ```
pub trait Observer<S: State, C>: Send + Sync + 'static {
    /// The interests of this observer type, in the order they should be
    /// registered.
    fn interests() -> Vec<Interest<Self, S, C>>
    where
        Self: Sized;
}
