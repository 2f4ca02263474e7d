//! Bridge errors.

use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// The owner loop was dropped or shut down; the request was discarded.
    #[error("Owner loop is gone; request dropped")]
    OwnerGone,

    /// The request was accepted but discarded before it ran.
    #[error("Owner loop dropped the request before running it")]
    CompletionLost,
}
