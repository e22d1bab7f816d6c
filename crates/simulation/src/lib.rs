//! Deterministic simulation runner.
//!
//! This crate provides a fully deterministic environment for running
//! several switches wired together by point-to-point links. Given the same
//! seed and the same inputs, it produces identical results every run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Event Queue (BTreeMap<EventKey, Event>)        │ │
//! │  │     Ordered by: time, priority, switch, sequence   │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     switches: Vec<Switch>                          │ │
//! │  │     Each processes events sequentially             │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │     Actions → frames over links, timers, stats     │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod event_queue;
mod network;
mod runner;

pub use event_queue::EventKey;
pub use network::{Endpoint, NetworkConfig, NetworkError, SimulatedNetwork};
pub use runner::{SimulationRunner, SimulationStats};

/// Index of a switch inside one simulation.
pub type SwitchIndex = u32;
