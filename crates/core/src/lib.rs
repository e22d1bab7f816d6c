//! Core types for rapidspan switches: events in, actions out.
//!
//! A switch is a synchronous [`StateMachine`]. The runner feeds it
//! [`Event`]s and carries out the returned [`Action`]s.

mod action;
mod event;
mod traits;

pub use action::Action;
pub use event::{Event, TimerId};
pub use traits::StateMachine;
