//! Conversation orchestration for Chatloom.
//!
//! The state machine drives one turn at a time through reasoning and tool
//! execution; the use-case selector assembles a configured state machine
//! for each supported conversation profile.

pub mod state_machine;
pub mod usecase;

pub use state_machine::{StateMachine, Step, Topology, TurnReport};
pub use usecase::{SessionOptions, UseCase, UseCaseSelector};
