//! Application coordinator.
//!
//! [`Application`] owns the network and interface machines. Everything that
//! wants to move either machine goes through it, either directly on the
//! owner thread or through a [`Dispatcher`] from a worker thread.
//!
//! Refused transitions are logged and reported as `false`; they never
//! propagate past this layer.

pub mod collaborators;
pub mod interface;
pub mod network;

pub use collaborators::{ProfileStore, ServerDirectory};
pub use interface::{InterfaceInput, InterfaceShape, InterfaceState, ServerId};
pub use network::{ConnectionId, ConnectionLookup, NetworkInput, NetworkShape, NetworkState};

use crate::bridge::Dispatcher;
use crate::builder::TableError;
use crate::config::AppConfig;
use crate::core::State;
use crate::engine::StateMachine;
use crate::registry::{Observer, ObserverId};
use interface::transitions::{SERVER_LISTS_REFRESHED, SERVER_LISTS_REFRESH_FAILED};
use std::io;
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Owns both machines and the collaborators used at startup.
pub struct Application {
    network: StateMachine<NetworkState, NetworkInput>,
    interface: StateMachine<InterfaceState, InterfaceInput>,
    profiles: Arc<dyn ProfileStore>,
    directory: Arc<dyn ServerDirectory>,
    current_connection: RwLock<Option<ConnectionId>>,
}

impl Application {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        directory: Arc<dyn ServerDirectory>,
    ) -> Result<Self, TableError> {
        Self::with_config(&AppConfig::default(), profiles, directory)
    }

    pub fn with_config(
        config: &AppConfig,
        profiles: Arc<dyn ProfileStore>,
        directory: Arc<dyn ServerDirectory>,
    ) -> Result<Self, TableError> {
        let network = StateMachine::with_config(
            "network",
            NetworkState::NoConnection,
            network::network_table()?,
            config.dispatch.clone(),
        );
        let interface = StateMachine::with_config(
            "interface",
            InterfaceState::Loading,
            interface::interface_table()?,
            config.dispatch.clone(),
        );

        Ok(Self {
            network,
            interface,
            profiles,
            directory,
            current_connection: RwLock::new(None),
        })
    }

    pub fn network_state(&self) -> NetworkState {
        self.network.current_state()
    }

    pub fn interface_state(&self) -> InterfaceState {
        self.interface.current_state()
    }

    pub fn network(&self) -> &StateMachine<NetworkState, NetworkInput> {
        &self.network
    }

    pub fn interface(&self) -> &StateMachine<InterfaceState, InterfaceInput> {
        &self.interface
    }

    /// The stored profile found at startup, once the lookup has reported.
    pub fn current_connection(&self) -> Option<ConnectionId> {
        *self.current_connection.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a network transition, returning whether it was applied.
    pub fn network_transition(&self, name: &str, input: NetworkInput) -> bool {
        apply(&self.network, name, input)
    }

    /// Apply an interface transition, returning whether it was applied.
    pub fn interface_transition(&self, name: &str, input: InterfaceInput) -> bool {
        apply(&self.interface, name, input)
    }

    /// Connect `observer` to both machines.
    pub fn connect_observer<O>(&self, observer: &Arc<O>) -> (ObserverId, ObserverId)
    where
        O: Observer<NetworkState, NetworkInput> + Observer<InterfaceState, InterfaceInput>,
    {
        (
            self.network.connect_object(observer),
            self.interface.connect_object(observer),
        )
    }

    pub fn connect_network_observer<O>(&self, observer: &Arc<O>) -> ObserverId
    where
        O: Observer<NetworkState, NetworkInput>,
    {
        self.network.connect_object(observer)
    }

    pub fn connect_interface_observer<O>(&self, observer: &Arc<O>) -> ObserverId
    where
        O: Observer<InterfaceState, InterfaceInput>,
    {
        self.interface.connect_object(observer)
    }

    /// Start both startup initializers on worker threads.
    ///
    /// Each reports its outcome through `dispatcher` exactly once, so the
    /// transitions only apply when the owner loop runs.
    pub fn initialize(self: &Arc<Self>, dispatcher: &Dispatcher) -> io::Result<Initializers> {
        Ok(Initializers {
            network: self.initialize_network(dispatcher)?,
            server_db: self.initialize_server_db(dispatcher)?,
        })
    }

    /// Look up the stored profile and report what was found.
    pub fn initialize_network(
        self: &Arc<Self>,
        dispatcher: &Dispatcher,
    ) -> io::Result<JoinHandle<()>> {
        let app = Arc::clone(self);
        let report = dispatcher.make_threadsafe(move |lookup: ConnectionLookup| {
            let (name, input) = lookup.transition();
            if app.network_transition(name, input) {
                if let ConnectionLookup::Previous(id) = lookup {
                    *app
                        .current_connection
                        .write()
                        .unwrap_or_else(PoisonError::into_inner) = Some(id);
                }
            }
        });
        let profiles = Arc::clone(&self.profiles);

        thread::Builder::new()
            .name("network-init".to_string())
            .spawn(move || {
                let lookup = ConnectionLookup::from_lookup(profiles.lookup_existing_connection());
                debug!(?lookup, "profile lookup finished");
                report.call(lookup);
            })
    }

    /// Refresh the server lists and report the outcome.
    pub fn initialize_server_db(
        self: &Arc<Self>,
        dispatcher: &Dispatcher,
    ) -> io::Result<JoinHandle<()>> {
        let app = Arc::clone(self);
        let report = dispatcher.make_threadsafe(move |outcome: (&'static str, InterfaceInput)| {
            let (name, input) = outcome;
            app.interface_transition(name, input);
        });
        let directory = Arc::clone(&self.directory);

        thread::Builder::new()
            .name("server-db-init".to_string())
            .spawn(move || {
                let outcome = match directory.refresh_server_lists() {
                    Ok(()) => (SERVER_LISTS_REFRESHED, InterfaceInput::None),
                    Err(err) => {
                        warn!(error = %format!("{:#}", err), "server list refresh failed");
                        (SERVER_LISTS_REFRESH_FAILED, InterfaceInput::Failure(err.to_string()))
                    }
                };
                report.call(outcome);
            })
    }
}

/// Join handles of the startup initializers.
#[derive(Debug)]
pub struct Initializers {
    pub network: JoinHandle<()>,
    pub server_db: JoinHandle<()>,
}

impl Initializers {
    /// Wait for both workers to hand off their results.
    pub fn join(self) -> thread::Result<()> {
        self.network.join()?;
        self.server_db.join()
    }
}

fn apply<S: State, C: 'static>(machine: &StateMachine<S, C>, name: &str, context: C) -> bool {
    let before = machine.current_state();
    info!(machine = machine.label(), from = before.name(), transition = name, "transitioning");

    match machine.transition(name, context) {
        Ok(report) => {
            let after = machine.current_state();
            info!(
                machine = machine.label(),
                transition = name,
                to = after.name(),
                callbacks = report.invoked,
                failed = report.failed,
                "transitioned"
            );
            true
        }
        Err(err) if err.is_invalid_transition() => {
            error!(machine = machine.label(), error = %err, "invalid state transition");
            false
        }
        Err(err) => {
            error!(machine = machine.label(), error = %err, "state transition refused");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge;
    use crate::core::TransitionEvent;
    use crate::registry::Interest;
    use std::sync::Mutex;
    use uuid::Uuid;

    fn app(found: Option<ConnectionId>, refresh_ok: bool) -> Arc<Application> {
        let profiles: Arc<dyn ProfileStore> = Arc::new(move || found);
        let directory: Arc<dyn ServerDirectory> = Arc::new(move || {
            if refresh_ok {
                Ok(())
            } else {
                Err(anyhow::anyhow!("directory unreachable"))
            }
        });
        Arc::new(Application::new(profiles, directory).unwrap())
    }

    type NetworkEvent<'a> = TransitionEvent<'a, NetworkState, NetworkInput>;
    type InterfaceEvent<'a> = TransitionEvent<'a, InterfaceState, InterfaceInput>;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn on_network(&self, event: &NetworkEvent<'_>) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(format!("network:{}", event.to.name()));
            Ok(())
        }

        fn on_menu(&self, event: &InterfaceEvent<'_>) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(format!("interface:{}", event.to.name()));
            Ok(())
        }
    }

    impl Observer<NetworkState, NetworkInput> for Recorder {
        fn interests() -> Vec<Interest<Self, NetworkState, NetworkInput>> {
            vec![Interest::edge(
                NetworkShape::NoConnection,
                NetworkShape::HasConnection,
                Self::on_network,
            )]
        }
    }

    impl Observer<InterfaceState, InterfaceInput> for Recorder {
        fn interests() -> Vec<Interest<Self, InterfaceState, InterfaceInput>> {
            vec![Interest::entry(InterfaceShape::MainMenu, Self::on_menu)]
        }
    }

    #[test]
    fn starts_in_initial_states() {
        let app = app(None, true);

        assert_eq!(app.network_state(), NetworkState::NoConnection);
        assert_eq!(app.interface_state(), InterfaceState::Loading);
        assert_eq!(app.current_connection(), None);
    }

    #[test]
    fn invalid_transitions_are_swallowed() {
        let app = app(None, true);

        let reserved = network::transitions::FOUND_ACTIVE_CONNECTION;
        assert!(!app.network_transition(reserved, NetworkInput::None));
        assert!(!app.interface_transition(interface::transitions::GO_BACK, InterfaceInput::None));
        assert_eq!(app.network_state(), NetworkState::NoConnection);
        assert_eq!(app.interface_state(), InterfaceState::Loading);
    }

    #[test]
    fn initializers_report_through_the_owner_loop() {
        let id = ConnectionId::new(Uuid::new_v4());
        let app = app(Some(id), true);
        let (dispatcher, mut owner) = bridge::channel();

        app.initialize(&dispatcher).unwrap().join().unwrap();
        assert_eq!(app.network_state(), NetworkState::NoConnection);

        assert_eq!(owner.run_pending(), 2);
        assert_eq!(app.network_state(), NetworkState::HasConnection(id));
        assert_eq!(app.interface_state(), InterfaceState::MainMenu);
        assert_eq!(app.current_connection(), Some(id));
    }

    #[test]
    fn missing_profile_and_failed_refresh() {
        let app = app(None, false);
        let (dispatcher, mut owner) = bridge::channel();

        app.initialize(&dispatcher).unwrap().join().unwrap();
        owner.run_pending();

        assert_eq!(app.network_state(), NetworkState::NoPreviousConnection);
        assert_eq!(
            app.interface_state(),
            InterfaceState::LoadFailed("directory unreachable".to_string())
        );
        assert_eq!(app.current_connection(), None);
    }

    #[test]
    fn observer_connected_to_both_machines() {
        let id = ConnectionId::new(Uuid::new_v4());
        let app = app(None, true);
        let recorder = Arc::new(Recorder::default());
        app.connect_observer(&recorder);

        assert!(app.network_transition(
            network::transitions::FOUND_PREVIOUS_CONNECTION,
            NetworkInput::Connection(id)
        ));
        assert!(app.interface_transition(
            interface::transitions::SERVER_LISTS_REFRESHED,
            InterfaceInput::None
        ));

        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec!["network:HasConnection", "interface:MainMenu"]
        );
    }
}
