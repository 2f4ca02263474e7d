//! User-interface presentation machine.

use crate::builder::{rule, TableError, TransitionBuilder, TransitionTableBuilder};
use crate::engine::{RuleError, TransitionTable};
use crate::state_enum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Base URL of a VPN server, as listed in the server directory.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerId(String);

impl ServerId {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self(base_url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

state_enum! {
    /// What the interface is showing.
    pub enum InterfaceState {
        /// Waiting for the server lists.
        Loading,
        /// The server lists could not be loaded.
        LoadFailed(String),
        MainMenu,
        Searching(String),
        ConfigureServer(ServerId),
        ConnectionStatus(ServerId),
    }
    shape: InterfaceShape
    error: [LoadFailed]
}

/// Data passed along with an interface transition.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum InterfaceInput {
    #[default]
    None,
    Query(String),
    Server(ServerId),
    Failure(String),
}

/// Interface transition names.
pub mod transitions {
    pub const SERVER_LISTS_REFRESHED: &str = "server_lists_refreshed";
    pub const SERVER_LISTS_REFRESH_FAILED: &str = "server_lists_refresh_failed";
    pub const RETRY: &str = "retry";
    pub const SEARCH: &str = "search";
    pub const CANCEL_SEARCH: &str = "cancel_search";
    pub const SELECT_SERVER: &str = "select_server";
    pub const SERVER_CONFIGURED: &str = "server_configured";
    pub const SHOW_CONNECTION_STATUS: &str = "show_connection_status";
    pub const GO_BACK: &str = "go_back";
}

use transitions::*;

type InterfaceRule = TransitionBuilder<InterfaceState, InterfaceInput>;

fn step(from: InterfaceShape, name: &str) -> InterfaceRule {
    rule(from, name)
}

fn search(_: &InterfaceState, input: &InterfaceInput) -> Result<InterfaceState, RuleError> {
    match input {
        InterfaceInput::Query(query) => Ok(InterfaceState::Searching(query.clone())),
        _ => Err(RuleError::new("search needs a query")),
    }
}

/// Into a screen about the server given in the input.
fn with_server(
    from: InterfaceShape,
    name: &str,
    shape: InterfaceShape,
    to: fn(ServerId) -> InterfaceState,
) -> InterfaceRule {
    step(from, name)
        .to(shape)
        .try_compute(move |_, input| match input {
            InterfaceInput::Server(server) => Ok(to(server.clone())),
            _ => Err(RuleError::new("a server must be given")),
        })
}

fn load_failed(_: &InterfaceState, input: &InterfaceInput) -> Result<InterfaceState, RuleError> {
    let message = match input {
        InterfaceInput::Failure(message) => message.clone(),
        _ => "unknown error".to_string(),
    };
    Ok(InterfaceState::LoadFailed(message))
}

fn configured(state: &InterfaceState, _: &InterfaceInput) -> Result<InterfaceState, RuleError> {
    match state {
        InterfaceState::ConfigureServer(server) => {
            Ok(InterfaceState::ConnectionStatus(server.clone()))
        }
        _ => Err(RuleError::new("no server is being configured")),
    }
}

/// Rules of the interface machine.
pub fn interface_table() -> Result<Arc<TransitionTable<InterfaceState, InterfaceInput>>, TableError>
{
    TransitionTableBuilder::new()
        .rule(
            step(InterfaceShape::Loading, SERVER_LISTS_REFRESHED)
                .goes_to(InterfaceState::MainMenu),
        )
        .rule(
            step(InterfaceShape::Loading, SERVER_LISTS_REFRESH_FAILED)
                .to(InterfaceShape::LoadFailed)
                .try_compute(load_failed),
        )
        .rule(step(InterfaceShape::LoadFailed, RETRY).goes_to(InterfaceState::Loading))
        .rule(
            step(InterfaceShape::MainMenu, SEARCH)
                .to(InterfaceShape::Searching)
                .try_compute(search),
        )
        .rule(with_server(
            InterfaceShape::MainMenu,
            SELECT_SERVER,
            InterfaceShape::ConfigureServer,
            InterfaceState::ConfigureServer,
        ))
        .rule(with_server(
            InterfaceShape::MainMenu,
            SHOW_CONNECTION_STATUS,
            InterfaceShape::ConnectionStatus,
            InterfaceState::ConnectionStatus,
        ))
        .rule(
            step(InterfaceShape::Searching, SEARCH)
                .to(InterfaceShape::Searching)
                .try_compute(search),
        )
        .rule(step(InterfaceShape::Searching, CANCEL_SEARCH).goes_to(InterfaceState::MainMenu))
        .rule(with_server(
            InterfaceShape::Searching,
            SELECT_SERVER,
            InterfaceShape::ConfigureServer,
            InterfaceState::ConfigureServer,
        ))
        .rule(step(InterfaceShape::ConfigureServer, GO_BACK).goes_to(InterfaceState::MainMenu))
        .rule(
            step(InterfaceShape::ConfigureServer, SERVER_CONFIGURED)
                .to(InterfaceShape::ConnectionStatus)
                .try_compute(configured),
        )
        .rule(step(InterfaceShape::ConnectionStatus, GO_BACK).goes_to(InterfaceState::MainMenu))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::State;
    use crate::engine::StateMachine;

    fn machine() -> StateMachine<InterfaceState, InterfaceInput> {
        StateMachine::new("interface", InterfaceState::Loading, interface_table().unwrap())
    }

    #[test]
    fn table_is_valid_and_fully_reachable() {
        let table = interface_table().unwrap();
        assert!(table.unreachable_from(InterfaceShape::Loading).is_empty());
    }

    #[test]
    fn refresh_failure_carries_message_and_is_an_error_state() {
        let machine = machine();

        machine
            .transition(
                SERVER_LISTS_REFRESH_FAILED,
                InterfaceInput::Failure("directory unreachable".to_string()),
            )
            .unwrap();

        let state = machine.current_state();
        assert_eq!(state, InterfaceState::LoadFailed("directory unreachable".to_string()));
        assert!(state.is_error());

        machine.transition(RETRY, InterfaceInput::None).unwrap();
        assert_eq!(machine.current_state(), InterfaceState::Loading);
    }

    #[test]
    fn search_select_and_configure() {
        let machine = machine();
        let server = ServerId::new("https://vpn.example.org/");

        machine.transition(SERVER_LISTS_REFRESHED, InterfaceInput::None).unwrap();
        machine
            .transition(SEARCH, InterfaceInput::Query("exam".to_string()))
            .unwrap();
        machine
            .transition(SEARCH, InterfaceInput::Query("example".to_string()))
            .unwrap();
        assert_eq!(machine.current_state(), InterfaceState::Searching("example".to_string()));

        machine
            .transition(SELECT_SERVER, InterfaceInput::Server(server.clone()))
            .unwrap();
        machine.transition(SERVER_CONFIGURED, InterfaceInput::None).unwrap();

        assert_eq!(machine.current_state(), InterfaceState::ConnectionStatus(server));
    }

    #[test]
    fn search_without_query_is_refused() {
        let machine = machine();
        machine.transition(SERVER_LISTS_REFRESHED, InterfaceInput::None).unwrap();

        assert!(machine.transition(SEARCH, InterfaceInput::None).is_err());
        assert_eq!(machine.current_state(), InterfaceState::MainMenu);
    }
}
