//! Combined switch state machine.
//!
//! This crate composes the RSTP bridge and the GVRP application into one
//! [`Switch`] that implements [`StateMachine`](rapidspan_core::StateMachine).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Switch                           │
//! │                                                          │
//! │   Event ──► ┌────────────────┐    forwarding on/off      │
//! │             │  rstp::Bridge  │ ─────────────────────┐    │
//! │             └───────┬────────┘                      ▼    │
//! │                     │ BridgeFabric      ┌──────────────┐ │
//! │                     ▼                   │  gvrp::Gvrp  │ │
//! │             ┌────────────────┐          └──────┬───────┘ │
//! │             │  EgressFabric  │ ◄── PDUs, timers┘         │
//! │             │  (per-port cap)│                           │
//! │             └───────┬────────┘                           │
//! │                     ▼                                    │
//! │                Vec<Action>                               │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod config;
mod egress;
mod error;
mod switch;

pub use config::SwitchConfig;
pub use error::SwitchError;
pub use switch::Switch;
