//! What a callback is registered for.

use std::fmt;

/// Identifies a registered callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(pub(crate) u64);

/// Identifies a connected observer object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub(crate) u64);

/// The condition under which a callback fires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trigger<Sh> {
    /// The machine entered a state of this shape.
    Entry(Sh),

    /// The machine moved along an edge. `from: None` matches any source
    /// shape; `name: None` matches any transition name.
    Edge {
        from: Option<Sh>,
        to: Sh,
        name: Option<String>,
    },
}

impl<Sh: Copy + Eq> Trigger<Sh> {
    pub fn entry(to: Sh) -> Self {
        Trigger::Entry(to)
    }

    pub fn edge(from: Sh, to: Sh) -> Self {
        Trigger::Edge {
            from: Some(from),
            to,
            name: None,
        }
    }

    pub fn edge_into(to: Sh) -> Self {
        Trigger::Edge {
            from: None,
            to,
            name: None,
        }
    }

    /// Restrict an edge trigger to one transition name.
    /// Entry triggers are returned unchanged.
    pub fn named(self, transition: impl Into<String>) -> Self {
        match self {
            Trigger::Edge { from, to, .. } => Trigger::Edge {
                from,
                to,
                name: Some(transition.into()),
            },
            entry => entry,
        }
    }

    pub fn is_edge(&self) -> bool {
        matches!(self, Trigger::Edge { .. })
    }

    /// Whether this is an edge trigger matching the given transition.
    pub fn matches_edge(&self, from: Sh, to: Sh, transition: &str) -> bool {
        match self {
            Trigger::Edge {
                from: edge_from,
                to: edge_to,
                name,
            } => {
                *edge_to == to
                    && edge_from.is_none_or(|f| f == from)
                    && name.as_deref().is_none_or(|n| n == transition)
            }
            Trigger::Entry(_) => false,
        }
    }

    /// Whether this is an entry trigger for the given shape.
    pub fn matches_entry(&self, to: Sh) -> bool {
        matches!(self, Trigger::Entry(shape) if *shape == to)
    }
}

impl<Sh: fmt::Display> fmt::Display for Trigger<Sh> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Entry(to) => write!(f, "enter {}", to),
            Trigger::Edge { from, to, name } => {
                match from {
                    Some(from) => write!(f, "{} -> {}", from, to)?,
                    None => write!(f, "* -> {}", to)?,
                }
                if let Some(name) = name {
                    write!(f, " via {}", name)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Shape {
        A,
        B,
        C,
    }

    impl fmt::Display for Shape {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    #[test]
    fn exact_edge_matches_only_its_pair() {
        let trigger = Trigger::edge(Shape::A, Shape::B);

        assert!(trigger.matches_edge(Shape::A, Shape::B, "go"));
        assert!(!trigger.matches_edge(Shape::C, Shape::B, "go"));
        assert!(!trigger.matches_edge(Shape::A, Shape::C, "go"));
        assert!(!trigger.matches_entry(Shape::B));
    }

    #[test]
    fn wildcard_edge_matches_any_source() {
        let trigger = Trigger::edge_into(Shape::B);

        assert!(trigger.matches_edge(Shape::A, Shape::B, "x"));
        assert!(trigger.matches_edge(Shape::C, Shape::B, "y"));
        assert!(trigger.matches_edge(Shape::B, Shape::B, "z"));
    }

    #[test]
    fn named_edge_filters_transition_name() {
        let trigger = Trigger::edge(Shape::A, Shape::B).named("go");

        assert!(trigger.matches_edge(Shape::A, Shape::B, "go"));
        assert!(!trigger.matches_edge(Shape::A, Shape::B, "jump"));
    }

    #[test]
    fn entry_ignores_names() {
        let trigger = Trigger::entry(Shape::C).named("ignored");

        assert_eq!(trigger, Trigger::Entry(Shape::C));
        assert!(trigger.matches_entry(Shape::C));
        assert!(!trigger.is_edge());
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(Trigger::entry(Shape::A).to_string(), "enter A");
        assert_eq!(
            Trigger::edge(Shape::A, Shape::B).named("go").to_string(),
            "A -> B via go"
        );
        assert_eq!(Trigger::<Shape>::edge_into(Shape::C).to_string(), "* -> C");
    }
}
