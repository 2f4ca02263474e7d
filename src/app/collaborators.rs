//! Services the startup initializers consult.
//!
//! Both calls may take a long time and run on worker threads, never on the
//! owner thread.

use super::network::ConnectionId;

/// Stored connection profiles.
pub trait ProfileStore: Send + Sync + 'static {
    /// The profile used last time, if one was saved.
    fn lookup_existing_connection(&self) -> Option<ConnectionId>;
}

impl<F> ProfileStore for F
where
    F: Fn() -> Option<ConnectionId> + Send + Sync + 'static,
{
    fn lookup_existing_connection(&self) -> Option<ConnectionId> {
        self()
    }
}

/// Remote directory of VPN servers.
pub trait ServerDirectory: Send + Sync + 'static {
    /// Fetch fresh server lists.
    fn refresh_server_lists(&self) -> anyhow::Result<()>;
}

impl<F> ServerDirectory for F
where
    F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn refresh_server_lists(&self) -> anyhow::Result<()> {
        self()
    }
}
