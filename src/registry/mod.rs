//! Callback registry: who gets told about which transitions.
//!
//! Two kinds of callback exist. *Entry* callbacks fire whenever the machine
//! enters a given shape. *Edge* callbacks fire only on a specific
//! `from -> to` pair (or any edge into a shape), optionally restricted to
//! one transition name.
//!
//! Dispatch order for one transition is fixed:
//! 1. every matching edge callback, in registration order
//! 2. every matching entry callback, in registration order
//!
//! A failing callback (error or panic) is logged and skipped. It never
//! stops the callbacks after it and never fails the transition.

mod observer;
mod trigger;

pub use observer::{Handler, Interest, Observer};
pub use trigger::{CallbackId, ObserverId, Trigger};

use crate::config::DispatchConfig;
use crate::core::{State, TransitionEvent};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Instant;
use tracing::{debug, error, warn};

/// Type alias for free-standing callbacks.
pub type Callback<S, C> =
    Arc<dyn Fn(&TransitionEvent<'_, S, C>) -> anyhow::Result<()> + Send + Sync>;

/// Outcome of running one registered callback.
enum Invocation {
    Ran(anyhow::Result<()>),
    /// The observer behind the callback has been dropped.
    Detached,
}

type Invoker<S, C> = Arc<dyn Fn(&TransitionEvent<'_, S, C>) -> Invocation + Send + Sync>;

fn invoker<S, C, F>(f: F) -> Invoker<S, C>
where
    S: State,
    F: Fn(&TransitionEvent<'_, S, C>) -> Invocation + Send + Sync + 'static,
{
    Arc::new(f)
}

struct Registration<S: State, C> {
    id: CallbackId,
    observer: Option<ObserverId>,
    trigger: Trigger<S::Shape>,
    invoke: Invoker<S, C>,
}

struct Connection {
    id: ObserverId,
    object: Weak<dyn Any + Send + Sync>,
}

impl Connection {
    fn is<O: Send + Sync + 'static>(&self, object: &Arc<O>) -> bool {
        self.object.strong_count() > 0
            && std::ptr::eq(
                self.object.as_ptr() as *const (),
                Arc::as_ptr(object) as *const (),
            )
    }
}

struct Inner<S: State, C> {
    registrations: Vec<Registration<S, C>>,
    connections: Vec<Connection>,
}

/// Summary of one dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Callbacks that ran, successfully or not
    pub invoked: usize,
    /// Callbacks that returned an error or panicked
    pub failed: usize,
    /// Callbacks dropped because their observer is gone
    pub pruned: usize,
}

impl DispatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Ordered callbacks for one machine.
///
/// Registration and dispatch take `&self`. The internal lock is never held
/// while a callback runs, so callbacks may register or remove callbacks.
pub struct CallbackRegistry<S: State, C> {
    label: String,
    config: DispatchConfig,
    next_id: AtomicU64,
    inner: Mutex<Inner<S, C>>,
}

impl<S: State, C: 'static> CallbackRegistry<S, C> {
    /// Create an empty registry with default dispatch settings.
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_config(label, DispatchConfig::default())
    }

    pub fn with_config(label: impl Into<String>, config: DispatchConfig) -> Self {
        Self {
            label: label.into(),
            config,
            next_id: AtomicU64::new(1),
            inner: Mutex::new(Inner {
                registrations: Vec::new(),
                connections: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<S, C>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn push(
        &self,
        trigger: Trigger<S::Shape>,
        observer: Option<ObserverId>,
        invoke: Invoker<S, C>,
    ) -> CallbackId {
        self.push_locked(&mut self.lock(), trigger, observer, invoke)
    }

    fn push_locked(
        &self,
        inner: &mut Inner<S, C>,
        trigger: Trigger<S::Shape>,
        observer: Option<ObserverId>,
        invoke: Invoker<S, C>,
    ) -> CallbackId {
        let id = CallbackId(self.next_id());
        debug!(machine = %self.label, callback = id.0, trigger = %trigger, "registered callback");
        inner.registrations.push(Registration {
            id,
            observer,
            trigger,
            invoke,
        });
        id
    }

    /// Register a callback for an arbitrary trigger.
    pub fn register<F>(&self, trigger: Trigger<S::Shape>, callback: F) -> CallbackId
    where
        F: Fn(&TransitionEvent<'_, S, C>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.push(
            trigger,
            None,
            invoker(move |event| Invocation::Ran(callback(event))),
        )
    }

    /// Fire whenever the machine enters `to`.
    pub fn register_entry<F>(&self, to: S::Shape, callback: F) -> CallbackId
    where
        F: Fn(&TransitionEvent<'_, S, C>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(Trigger::entry(to), callback)
    }

    /// Fire on `from -> to`, by the named transition or, with `None`, by any.
    pub fn register_edge<F>(
        &self,
        from: S::Shape,
        to: S::Shape,
        name: Option<&str>,
        callback: F,
    ) -> CallbackId
    where
        F: Fn(&TransitionEvent<'_, S, C>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let trigger = match name {
            Some(name) => Trigger::edge(from, to).named(name),
            None => Trigger::edge(from, to),
        };
        self.register(trigger, callback)
    }

    /// Fire as an edge callback on any edge into `to`.
    pub fn register_edge_into<F>(&self, to: S::Shape, name: Option<&str>, callback: F) -> CallbackId
    where
        F: Fn(&TransitionEvent<'_, S, C>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let trigger = match name {
            Some(name) => Trigger::edge_into(to).named(name),
            None => Trigger::edge_into(to),
        };
        self.register(trigger, callback)
    }

    /// Register every interest declared by the observer's type.
    ///
    /// The registry keeps only a weak reference: once the last `Arc` is
    /// dropped its callbacks stop firing and are pruned. Connecting the
    /// same live object again returns its existing id without registering
    /// anything twice.
    pub fn connect_object<O: Observer<S, C>>(&self, object: &Arc<O>) -> ObserverId {
        let mut inner = self.lock();
        if let Some(existing) = inner.connections.iter().find(|c| c.is(object)) {
            return existing.id;
        }

        let observer = ObserverId(self.next_id());
        let weak: Weak<O> = Arc::downgrade(object);
        inner.connections.push(Connection {
            id: observer,
            object: weak.clone(),
        });

        for interest in O::interests() {
            let weak = weak.clone();
            let handler = interest.handler;
            self.push_locked(
                &mut inner,
                interest.trigger,
                Some(observer),
                invoker(move |event| match weak.upgrade() {
                    Some(object) => Invocation::Ran(handler(&object, event)),
                    None => Invocation::Detached,
                }),
            );
        }

        observer
    }

    /// Remove every callback registered for an observer.
    /// Returns how many were removed.
    pub fn disconnect(&self, observer: ObserverId) -> usize {
        let mut inner = self.lock();
        inner.connections.retain(|connection| connection.id != observer);
        let before = inner.registrations.len();
        inner
            .registrations
            .retain(|registration| registration.observer != Some(observer));
        before - inner.registrations.len()
    }

    /// Remove one callback. Returns `false` if it was not registered.
    pub fn remove(&self, id: CallbackId) -> bool {
        let mut inner = self.lock();
        let before = inner.registrations.len();
        inner.registrations.retain(|registration| registration.id != id);
        inner.registrations.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Callbacks that match a transition, edges first, each group in
    /// registration order.
    fn matching(&self, event: &TransitionEvent<'_, S, C>) -> Vec<(CallbackId, Invoker<S, C>)> {
        let (from, to) = event.edge();
        let inner = self.lock();

        let edges = inner
            .registrations
            .iter()
            .filter(|r| r.trigger.matches_edge(from, to, event.name));
        let entries = inner
            .registrations
            .iter()
            .filter(|r| r.trigger.matches_entry(to));

        edges
            .chain(entries)
            .map(|r| (r.id, Arc::clone(&r.invoke)))
            .collect()
    }

    /// Run every callback matching the transition.
    pub fn dispatch(&self, event: &TransitionEvent<'_, S, C>) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut detached = Vec::new();

        for (id, invoke) in self.matching(event) {
            let started = Instant::now();
            let outcome = if self.config.isolate_panics {
                panic::catch_unwind(AssertUnwindSafe(|| invoke(event)))
            } else {
                Ok(invoke(event))
            };

            match outcome {
                Ok(Invocation::Detached) => {
                    detached.push(id);
                    continue;
                }
                Ok(Invocation::Ran(Ok(()))) => {}
                Ok(Invocation::Ran(Err(err))) => {
                    report.failed += 1;
                    error!(
                        machine = %self.label,
                        callback = id.0,
                        from = %event.from.name(),
                        to = %event.to.name(),
                        transition = %event.name,
                        "state transition callback failed: {:#}",
                        err
                    );
                }
                Err(payload) => {
                    report.failed += 1;
                    error!(
                        machine = %self.label,
                        callback = id.0,
                        from = %event.from.name(),
                        to = %event.to.name(),
                        transition = %event.name,
                        "state transition callback panicked: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
            report.invoked += 1;

            if let Some(threshold) = self.config.slow_callback_threshold() {
                let elapsed = started.elapsed();
                if elapsed > threshold {
                    warn!(
                        machine = %self.label,
                        callback = id.0,
                        transition = %event.name,
                        "slow state transition callback: {:?}",
                        elapsed
                    );
                }
            }
        }

        if !detached.is_empty() {
            let mut inner = self.lock();
            inner
                .registrations
                .retain(|registration| !detached.contains(&registration.id));
            inner
                .connections
                .retain(|connection| connection.object.strong_count() > 0);
            report.pruned = detached.len();
            debug!(
                machine = %self.label,
                pruned = report.pruned,
                "pruned callbacks of dropped observers"
            );
        }

        report
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_enum;
    use std::sync::atomic::AtomicUsize;

    state_enum! {
        enum Net {
            Offline,
            Online(u32),
            Error,
        }
        shape: NetShape
    }

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(
        log: &Log,
        label: &'static str,
    ) -> impl Fn(&TransitionEvent<'_, Net, ()>) -> anyhow::Result<()> + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |_| {
            log.lock().unwrap().push(label.to_string());
            Ok(())
        }
    }

    fn go_online(registry: &CallbackRegistry<Net, ()>) -> DispatchReport {
        registry.dispatch(&TransitionEvent {
            from: &Net::Offline,
            to: &Net::Online(7),
            name: "connect",
            context: &(),
        })
    }

    #[test]
    fn edges_fire_before_entries_in_registration_order() {
        let registry = CallbackRegistry::<Net, ()>::new("test");
        let log: Log = Arc::default();

        registry.register_entry(NetShape::Online, recorder(&log, "entry-1"));
        registry.register_edge(
            NetShape::Offline,
            NetShape::Online,
            None,
            recorder(&log, "edge-1"),
        );
        registry.register_entry(NetShape::Online, recorder(&log, "entry-2"));
        registry.register_edge_into(NetShape::Online, None, recorder(&log, "edge-any"));
        registry.register_edge(
            NetShape::Offline,
            NetShape::Online,
            Some("connect"),
            recorder(&log, "edge-named"),
        );

        let report = go_online(&registry);

        assert_eq!(report.invoked, 5);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["edge-1", "edge-any", "edge-named", "entry-1", "entry-2"]
        );
    }

    #[test]
    fn non_matching_callbacks_do_not_fire() {
        let registry = CallbackRegistry::<Net, ()>::new("test");
        let log: Log = Arc::default();

        registry.register_entry(NetShape::Error, recorder(&log, "error"));
        registry.register_edge(
            NetShape::Error,
            NetShape::Online,
            None,
            recorder(&log, "wrong-source"),
        );
        registry.register_edge(
            NetShape::Offline,
            NetShape::Online,
            Some("retry"),
            recorder(&log, "wrong-name"),
        );

        let report = go_online(&registry);

        assert_eq!(report, DispatchReport::default());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn failing_callbacks_are_isolated() {
        let registry = CallbackRegistry::<Net, ()>::new("test");
        let log: Log = Arc::default();

        registry.register_entry(NetShape::Online, |_| Err(anyhow::anyhow!("boom")));
        registry.register_entry(NetShape::Online, |_| panic!("observer bug"));
        registry.register_entry(NetShape::Online, recorder(&log, "after"));

        let report = go_online(&registry);

        assert_eq!(report.invoked, 3);
        assert_eq!(report.failed, 2);
        assert!(!report.all_succeeded());
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
    }

    #[test]
    fn removed_callbacks_stop_firing() {
        let registry = CallbackRegistry::<Net, ()>::new("test");
        let log: Log = Arc::default();

        let id = registry.register_entry(NetShape::Online, recorder(&log, "gone"));
        registry.register_entry(NetShape::Online, recorder(&log, "kept"));

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        go_online(&registry);

        assert_eq!(*log.lock().unwrap(), vec!["kept"]);
    }

    #[test]
    fn callbacks_see_event_data() {
        let registry = CallbackRegistry::<Net, ()>::new("test");
        let seen = Arc::new(Mutex::new(None));

        let sink = Arc::clone(&seen);
        registry.register_entry(NetShape::Online, move |event| {
            let name = event.name.to_string();
            *sink.lock().unwrap() = Some((event.from.clone(), event.to.clone(), name));
            Ok(())
        });

        go_online(&registry);

        assert_eq!(
            *seen.lock().unwrap(),
            Some((Net::Offline, Net::Online(7), "connect".to_string()))
        );
    }

    #[derive(Default)]
    struct Panel {
        edges: AtomicUsize,
        entries: AtomicUsize,
    }

    impl Panel {
        fn on_came_online(&self, _event: &TransitionEvent<'_, Net, ()>) -> anyhow::Result<()> {
            self.edges.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn on_online(&self, _event: &TransitionEvent<'_, Net, ()>) -> anyhow::Result<()> {
            self.entries.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl Observer<Net, ()> for Panel {
        fn interests() -> Vec<Interest<Self, Net, ()>> {
            vec![
                Interest::edge(NetShape::Offline, NetShape::Online, Self::on_came_online),
                Interest::entry(NetShape::Online, Self::on_online),
            ]
        }
    }

    #[test]
    fn connect_object_registers_declared_interests_once() {
        let registry = CallbackRegistry::<Net, ()>::new("test");
        let panel = Arc::new(Panel::default());

        let first = registry.connect_object(&panel);
        let second = registry.connect_object(&panel);

        assert_eq!(first, second);
        assert_eq!(registry.len(), 2);

        go_online(&registry);
        assert_eq!(panel.edges.load(Ordering::SeqCst), 1);
        assert_eq!(panel.entries.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_connects_register_the_object_once() {
        let registry = Arc::new(CallbackRegistry::<Net, ()>::new("test"));
        let panel = Arc::new(Panel::default());

        let ids: Vec<ObserverId> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let panel = Arc::clone(&panel);
                std::thread::spawn(move || registry.connect_object(&panel))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(registry.len(), 2);

        go_online(&registry);
        assert_eq!(panel.entries.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_observers_are_pruned() {
        let registry = CallbackRegistry::<Net, ()>::new("test");
        let panel = Arc::new(Panel::default());
        registry.connect_object(&panel);
        drop(panel);

        let report = go_online(&registry);

        assert_eq!(report.invoked, 0);
        assert_eq!(report.pruned, 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn disconnect_removes_all_observer_callbacks() {
        let registry = CallbackRegistry::<Net, ()>::new("test");
        let panel = Arc::new(Panel::default());
        let id = registry.connect_object(&panel);
        registry.register_entry(NetShape::Online, |_| Ok(()));

        assert_eq!(registry.disconnect(id), 2);
        assert_eq!(registry.len(), 1);

        go_online(&registry);
        assert_eq!(panel.entries.load(Ordering::SeqCst), 0);

        let again = registry.connect_object(&panel);
        assert_ne!(again, id);
    }

    #[test]
    fn callbacks_may_register_during_dispatch() {
        let registry = Arc::new(CallbackRegistry::<Net, ()>::new("test"));

        let inner = Arc::downgrade(&registry);
        registry.register_entry(NetShape::Online, move |_| {
            if let Some(registry) = inner.upgrade() {
                registry.register_entry(NetShape::Error, |_| Ok(()));
            }
            Ok(())
        });

        let report = go_online(&registry);
        assert_eq!(report.invoked, 1);
        assert_eq!(registry.len(), 2);
    }
}
