//! GARP VLAN Registration Protocol.
//!
//! # Architecture
//!
//! ```text
//!   GVRP PDU ──► pdu::decode ──► Gvrp::receive_pdu
//!                                   │  VLAN id ─► GVD slot (VlanRegistry)
//!                                   ▼
//!                            ┌──────────────┐  join/leave indications
//!                            │ Garp engine  │ ─────────────────────────► member sets
//!                            └──────┬───────┘
//!                                   │ transmit(port, TxCursor)
//!                                   ▼
//!                        VlanRegistry builds one PDU per call
//!                                   │
//!                                   ▼
//!                         Gvrp::take_outbound()
//! ```
//!
//! Each port's PVID and static VLANs are registered as fixed when the port
//! is added. Dynamic registrations arrive in PDUs and are propagated to the
//! other forwarding ports through GIP.

mod config;
mod error;
mod gvrp;
pub mod pdu;
mod registry;

pub use config::{GvrpConfig, GvrpPortConfig};
pub use error::GvrpError;
pub use gvrp::Gvrp;
pub use pdu::{PduBuilder, PduError, PduRecord};
pub use registry::{EventCounters, GvrpPortStats, VlanRegistry};
