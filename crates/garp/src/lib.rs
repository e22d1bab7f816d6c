//! Generic Attribute Registration Protocol engine.
//!
//! # Architecture
//!
//! ```text
//!   received PDU / management / timer expiry
//!                    │
//!                    ▼
//!   ┌──────────────────────────────────────────┐
//!   │ Garp                                     │
//!   │                                          │
//!   │  GidPort ─┬─ GidMachine[attribute]       │  applicant + registrar tables
//!   │           └─ transmit / timer flags      │
//!   │                                          │
//!   │  gip[attribute] ── connected-port ring   │  join/leave propagation
//!   └──────────────┬───────────────────────────┘
//!                  │ GarpApplication callbacks, TimerRequest outbox
//!                  ▼
//!          application (e.g. GVRP)
//! ```
//!
//! The engine is synchronous and owns no clock: timers are requested through
//! [`Garp::take_timer_requests`] and their expiry is reported back by the
//! caller. Attribute indices are slots in the application's own table.

mod application;
mod config;
mod engine;
mod error;
mod gid;
mod port;

pub use application::GarpApplication;
pub use config::GarpConfig;
pub use engine::{Garp, GipStats, TimerRequest};
pub use error::GarpError;
pub use gid::{
    ApplicantManagement, ApplicantState, AttributeMessage, AttributeState, GidEvent,
    GidMachine, Indication, RegistrarManagement, RegistrarState, RegistrarStatus, Transition,
};
pub use port::{GidPort, Transmission, TxCursor, LEAVEALL_COUNT};
