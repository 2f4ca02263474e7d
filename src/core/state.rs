//! Core State trait for state machine states.
//!
//! A state is an immutable tagged value. Its *shape* is the variant tag with
//! any attached payload ignored; transition rules and observer callbacks are
//! keyed by shape, never by payload.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Trait for state machine states.
///
/// All methods are pure - no side effects.
///
/// # Required Traits
///
/// - `Clone`: the engine hands out copies of the current state to readers
/// - `PartialEq`: states must be comparable in tests and diagnostics
/// - `Debug`: states are logged on every transition
/// - `Serialize` + `Deserialize`: states appear in machine snapshots
/// - `Send` + `Sync`: the current state is readable from any thread
///
/// Most state types are declared with [`state_enum!`](crate::state_enum),
/// which generates the shape enum and this impl.
///
/// # Example
///
/// ```rust
/// use tandem::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Door {
///     Open,
///     Locked(u32),
/// }
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
/// enum DoorShape {
///     Open,
///     Locked,
/// }
///
/// impl std::fmt::Display for DoorShape {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         write!(f, "{:?}", self)
///     }
/// }
///
/// impl State for Door {
///     type Shape = DoorShape;
///
///     fn name(&self) -> &str {
///         match self {
///             Self::Open => "Open",
///             Self::Locked(_) => "Locked",
///         }
///     }
///
///     fn shape(&self) -> DoorShape {
///         match self {
///             Self::Open => DoorShape::Open,
///             Self::Locked(_) => DoorShape::Locked,
///         }
///     }
///
///     fn shapes() -> &'static [DoorShape] {
///         &[DoorShape::Open, DoorShape::Locked]
///     }
/// }
///
/// assert_eq!(Door::Locked(7).shape(), DoorShape::Locked);
/// assert_eq!(Door::Locked(7).name(), "Locked");
/// ```
pub trait State:
    Clone + PartialEq + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static
{
    /// Variant tag of this state type.
    type Shape: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static;

    /// Get the state's name for display/logging.
    fn name(&self) -> &str;

    /// Get the state's shape, ignoring payload.
    fn shape(&self) -> Self::Shape;

    /// The closed set of shapes this state type can take.
    fn shapes() -> &'static [Self::Shape];

    /// Check if a shape is final (terminal).
    ///
    /// Final shapes are allowed to have no outgoing transitions.
    ///
    /// Default implementation returns `false`.
    fn is_final_shape(_shape: Self::Shape) -> bool {
        false
    }

    /// Check if this is a final (terminal) state.
    fn is_final(&self) -> bool {
        Self::is_final_shape(self.shape())
    }

    /// Check if this is an error state.
    ///
    /// Default implementation returns `false`.
    fn is_error(&self) -> bool {
        false
    }
}
