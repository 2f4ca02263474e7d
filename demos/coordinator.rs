//! Start the application with simulated collaborators and drive the owner
//! loop on the main thread until both startup reports have arrived.
//!
//! ```text
//! cargo run --example coordinator [config.json]
//! TANDEM_LOG=tandem=debug cargo run --example coordinator
//! ```

use anyhow::Context;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tandem::app::interface::transitions as ui;
use tandem::app::{
    ConnectionId, InterfaceInput, InterfaceShape, InterfaceState, NetworkInput, NetworkShape,
    NetworkState, ProfileStore, ServerDirectory, ServerId,
};
use tandem::core::TransitionEvent;
use tandem::{bridge, telemetry, AppConfig, Application, Interest, Observer, State};
use tracing::info;
use uuid::Uuid;

type NetworkEvent<'a> = TransitionEvent<'a, NetworkState, NetworkInput>;
type InterfaceEvent<'a> = TransitionEvent<'a, InterfaceState, InterfaceInput>;

struct StatusBar;

impl StatusBar {
    fn profile_found(&self, event: &NetworkEvent<'_>) -> anyhow::Result<()> {
        if let Some(id) = event.to.connection() {
            info!(%id, "status bar: stored profile available");
        }
        Ok(())
    }

    fn menu_ready(&self, event: &InterfaceEvent<'_>) -> anyhow::Result<()> {
        info!(from = event.from.name(), "status bar: main menu ready");
        Ok(())
    }
}

impl Observer<NetworkState, NetworkInput> for StatusBar {
    fn interests() -> Vec<Interest<Self, NetworkState, NetworkInput>> {
        vec![Interest::edge(
            NetworkShape::NoConnection,
            NetworkShape::HasConnection,
            Self::profile_found,
        )]
    }
}

impl Observer<InterfaceState, InterfaceInput> for StatusBar {
    fn interests() -> Vec<Interest<Self, InterfaceState, InterfaceInput>> {
        vec![Interest::entry(InterfaceShape::MainMenu, Self::menu_ready)]
    }
}

fn load_config() -> anyhow::Result<AppConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path))?;
            AppConfig::from_json_str(&json).with_context(|| format!("parsing config {}", path))
        }
        None => Ok(AppConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    telemetry::init_logging(&config.logging);

    let stored = ConnectionId::new(Uuid::new_v4());
    let profiles: Arc<dyn ProfileStore> = Arc::new(move || {
        thread::sleep(Duration::from_millis(150));
        Some(stored)
    });
    let directory: Arc<dyn ServerDirectory> = Arc::new(|| -> anyhow::Result<()> {
        thread::sleep(Duration::from_millis(300));
        Ok(())
    });

    let app = Arc::new(Application::with_config(&config, profiles, directory)?);
    let status_bar = Arc::new(StatusBar);
    app.connect_observer(&status_bar);

    let (dispatcher, mut owner) = bridge::channel();
    let workers = app.initialize(&dispatcher).context("starting initializers")?;

    let stopper = dispatcher.clone();
    thread::spawn(move || {
        let _ = workers.join();
        let _ = stopper.shutdown();
    });
    owner.blocking_run();

    let server = ServerId::new("https://vpn.example.org/");
    app.interface_transition(ui::SELECT_SERVER, InterfaceInput::Server(server));
    app.interface_transition(ui::SERVER_CONFIGURED, InterfaceInput::None);
    // Refused: the interface is not loading any more.
    app.interface_transition(ui::SERVER_LISTS_REFRESHED, InterfaceInput::None);

    println!("network:   {:?}", app.network_state());
    println!("interface: {:?}", app.interface_state());
    println!("{}", app.network().snapshot().to_json_pretty()?);
    Ok(())
}
