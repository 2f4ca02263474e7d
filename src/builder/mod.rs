//! Builder API for declaring transition tables.
//!
//! Rules are declared with [`TransitionBuilder`] and collected by
//! [`TransitionTableBuilder`], which validates the whole table before
//! handing out an immutable, shareable [`TransitionTable`](crate::engine::TransitionTable).

pub mod error;
pub mod macros;
pub mod table;
pub mod transition;

pub use error::{BuildError, TableError};
pub use table::TransitionTableBuilder;
pub use transition::TransitionBuilder;

use crate::core::State;

/// Start a rule from `from` named `name`.
///
/// # Example
///
/// ```
/// use tandem::builder::{rule, TransitionTableBuilder};
/// use tandem::state_enum;
///
/// state_enum! {
///     enum Tap {
///         Closed,
///         Open,
///     }
///     shape: TapShape
/// }
///
/// let table = TransitionTableBuilder::<Tap, ()>::new()
///     .rule(rule(TapShape::Closed, "open").goes_to(Tap::Open))
///     .rule(rule(TapShape::Open, "close").goes_to(Tap::Closed))
///     .build()
///     .unwrap();
///
/// assert!(table.is_valid(TapShape::Open, "close"));
/// ```
pub fn rule<S, C>(from: S::Shape, name: impl Into<String>) -> TransitionBuilder<S, C>
where
    S: State,
    C: 'static,
{
    TransitionBuilder::new().from(from).named(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_enum;

    state_enum! {
        enum TestState {
            Start,
            End,
        }
        shape: TestShape
        final: [End]
    }

    #[test]
    fn rule_prefills_source_and_name() {
        let built = rule::<TestState, ()>(TestShape::Start, "finish")
            .goes_to(TestState::End)
            .build()
            .unwrap();

        assert_eq!(built.from, TestShape::Start);
        assert_eq!(built.name, "finish");
        assert_eq!(built.to, TestShape::End);
    }
}
