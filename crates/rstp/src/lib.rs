//! IEEE 802.1w rapid spanning tree.
//!
//! # Architecture
//!
//! ```text
//!   enable / disable / BPDU / tick / management
//!                    │
//!                    ▼
//!   ┌─────────────────────────────────────────────────────┐
//!   │ Bridge::sweep (repeat until nothing moves)          │
//!   │                                                     │
//!   │   Port Role Selection          (bridge-scoped)      │
//!   │        │                                            │
//!   │        ▼  for each port, until the port rests:      │
//!   │   Timers → Information → Role Transitions →         │
//!   │   State Transition → Topology Change →              │
//!   │   Protocol Migration → Transmit → Ageing →          │
//!   │   Edge Change Detection → Bridge Detection          │
//!   └──────────────────────┬──────────────────────────────┘
//!                          │ BridgeFabric
//!                          ▼
//!        send BPDU, flush / age entries, forwarding changes
//! ```
//!
//! The bridge is synchronous and owns no clock. The caller delivers one
//! [`Bridge::tick`] per second and every received frame; the bridge answers
//! through the [`BridgeFabric`] it is handed.
//!
//! Machines that never rest are a defect in the transition conditions, so
//! the driver panics rather than guess a state.

mod bridge;
mod config;
mod error;
mod fabric;
mod machines;
mod port;
mod selection;

pub use bridge::Bridge;
pub use config::{AdminPointToPoint, BridgeConfig, ForceVersion, PathCost, PortConfig};
pub use error::{ConfigError, TransmitError};
pub use fabric::BridgeFabric;
pub use port::{InfoIs, Port, PortStats};
