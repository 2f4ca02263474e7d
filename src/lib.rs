//! Tandem: declarative state machines with observer dispatch
//!
//! A machine is an immutable table of named transitions plus a current
//! state. Transitions are applied one at a time, and every observer whose
//! interest matches the resulting edge or state runs before the transition
//! call returns. Worker threads never touch a machine: they hand their
//! results to the owner thread through the [`bridge`].
//!
//! # Core Concepts
//!
//! - **State**: a closed enum of states, declared with [`state_enum!`]
//! - **Transition table**: rules keyed by state shape and transition name
//! - **Callbacks**: entry and edge callbacks, run in registration order
//! - **Bridge**: a queue that runs closures on the owner thread
//!
//! # Example
//!
//! ```rust
//! use tandem::builder::{rule, TransitionTableBuilder};
//! use tandem::{state_enum, StateMachine, TransitionError};
//!
//! state_enum! {
//!     enum Door {
//!         Closed,
//!         Open,
//!         Locked,
//!     }
//!     shape: DoorShape
//! }
//!
//! let table = TransitionTableBuilder::<Door, ()>::new()
//!     .rule(rule(DoorShape::Closed, "open").goes_to(Door::Open))
//!     .rule(rule(DoorShape::Open, "close").goes_to(Door::Closed))
//!     .rule(rule(DoorShape::Closed, "lock").goes_to(Door::Locked))
//!     .rule(rule(DoorShape::Locked, "unlock").goes_to(Door::Closed))
//!     .build()
//!     .unwrap();
//!
//! let door = StateMachine::new("door", Door::Closed, table);
//! door.callbacks().register_entry(DoorShape::Open, |event| {
//!     println!("opened from {:?}", event.from);
//!     Ok(())
//! });
//!
//! door.transition("open", ()).unwrap();
//! assert_eq!(door.current_state(), Door::Open);
//!
//! let err = door.transition("lock", ()).unwrap_err();
//! assert!(matches!(err, TransitionError::InvalidTransition { .. }));
//! assert_eq!(door.current_state(), Door::Open);
//! ```

pub mod app;
pub mod bridge;
pub mod builder;
pub mod config;
pub mod core;
pub mod engine;
pub mod registry;
pub mod telemetry;

// Re-export commonly used types
pub use app::Application;
pub use bridge::{Dispatcher, OwnerLoop, Threadsafe};
pub use config::AppConfig;
pub use core::{Guard, State, TransitionEvent};
pub use engine::{StateMachine, TransitionError, TransitionTable};
pub use registry::{CallbackRegistry, DispatchReport, Interest, Observer};
