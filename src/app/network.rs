//! Network connectivity machine.

use crate::builder::{rule, TableError, TransitionBuilder, TransitionTableBuilder};
use crate::core::State;
use crate::engine::{RuleError, TransitionTable};
use crate::state_enum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier of a stored connection profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ConnectionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

state_enum! {
    /// Where the network connection stands.
    pub enum NetworkState {
        /// Startup state, before any profile lookup has reported.
        NoConnection,
        /// No stored profile exists.
        NoPreviousConnection,
        /// A profile exists and is not active.
        HasConnection(ConnectionId),
        Connecting(ConnectionId),
        Connected(ConnectionId),
        Disconnecting(ConnectionId),
    }
    shape: NetworkShape
}

impl NetworkState {
    /// The profile this state refers to, if any.
    pub fn connection(&self) -> Option<ConnectionId> {
        match self {
            Self::NoConnection | Self::NoPreviousConnection => None,
            Self::HasConnection(id)
            | Self::Connecting(id)
            | Self::Connected(id)
            | Self::Disconnecting(id) => Some(*id),
        }
    }
}

/// Data passed along with a network transition.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum NetworkInput {
    #[default]
    None,
    Connection(ConnectionId),
}

impl NetworkInput {
    pub fn connection(&self) -> Option<ConnectionId> {
        match self {
            Self::None => None,
            Self::Connection(id) => Some(*id),
        }
    }
}

/// Network transition names.
pub mod transitions {
    pub const NO_PREVIOUS_CONNECTION_FOUND: &str = "no_previous_connection_found";
    pub const FOUND_PREVIOUS_CONNECTION: &str = "found_previous_connection";
    /// Reserved until active connections can be detected at startup. No
    /// rule exists for it, so requesting it is an invalid transition.
    pub const FOUND_ACTIVE_CONNECTION: &str = "found_active_connection";
    pub const SET_CONNECTION: &str = "set_connection";
    pub const CONNECT: &str = "connect";
    pub const CONNECTION_ESTABLISHED: &str = "connection_established";
    pub const CONNECTION_FAILED: &str = "connection_failed";
    pub const CONNECTION_LOST: &str = "connection_lost";
    pub const DISCONNECT: &str = "disconnect";
    pub const DISCONNECTED: &str = "disconnected";
}

use transitions::*;

/// What the startup profile lookup found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionLookup {
    NotFound,
    Previous(ConnectionId),
}

impl ConnectionLookup {
    pub fn from_lookup(found: Option<ConnectionId>) -> Self {
        match found {
            Some(id) => Self::Previous(id),
            None => Self::NotFound,
        }
    }

    /// The transition that reports this outcome to the network machine.
    pub fn transition(&self) -> (&'static str, NetworkInput) {
        match self {
            Self::NotFound => (NO_PREVIOUS_CONNECTION_FOUND, NetworkInput::None),
            Self::Previous(id) => (FOUND_PREVIOUS_CONNECTION, NetworkInput::Connection(*id)),
        }
    }
}

type NetworkRule = TransitionBuilder<NetworkState, NetworkInput>;

fn step(from: NetworkShape, name: &str) -> NetworkRule {
    rule(from, name)
}

/// Into `HasConnection`, taking the id from the input.
fn with_connection(from: NetworkShape, name: &'static str) -> NetworkRule {
    step(from, name)
        .to(NetworkShape::HasConnection)
        .try_compute(move |_, input| {
            input
                .connection()
                .map(NetworkState::HasConnection)
                .ok_or_else(|| RuleError::new(format!("'{}' needs a connection id", name)))
        })
}

/// Move to `to`, keeping the current connection.
fn carry(
    from: NetworkShape,
    name: &str,
    shape: NetworkShape,
    to: fn(ConnectionId) -> NetworkState,
) -> NetworkRule {
    step(from, name).to(shape).try_compute(move |state, _| {
        state
            .connection()
            .map(to)
            .ok_or_else(|| RuleError::new(format!("{} carries no connection", state.name())))
    })
}

/// Rules of the network machine.
pub fn network_table() -> Result<Arc<TransitionTable<NetworkState, NetworkInput>>, TableError> {
    TransitionTableBuilder::new()
        .rule(
            step(NetworkShape::NoConnection, NO_PREVIOUS_CONNECTION_FOUND)
                .goes_to(NetworkState::NoPreviousConnection),
        )
        .rule(with_connection(NetworkShape::NoConnection, FOUND_PREVIOUS_CONNECTION))
        .rule(with_connection(NetworkShape::NoPreviousConnection, SET_CONNECTION))
        .rule(with_connection(NetworkShape::HasConnection, SET_CONNECTION))
        .rule(carry(
            NetworkShape::HasConnection,
            CONNECT,
            NetworkShape::Connecting,
            NetworkState::Connecting,
        ))
        .rule(carry(
            NetworkShape::Connecting,
            CONNECTION_ESTABLISHED,
            NetworkShape::Connected,
            NetworkState::Connected,
        ))
        .rule(carry(
            NetworkShape::Connecting,
            CONNECTION_FAILED,
            NetworkShape::HasConnection,
            NetworkState::HasConnection,
        ))
        .rule(carry(
            NetworkShape::Connected,
            DISCONNECT,
            NetworkShape::Disconnecting,
            NetworkState::Disconnecting,
        ))
        .rule(carry(
            NetworkShape::Connected,
            CONNECTION_LOST,
            NetworkShape::HasConnection,
            NetworkState::HasConnection,
        ))
        .rule(carry(
            NetworkShape::Disconnecting,
            DISCONNECTED,
            NetworkShape::HasConnection,
            NetworkState::HasConnection,
        ))
        .build()
}
