//! Outbound actions for the runner to perform.

use crate::TimerId;
use bytes::Bytes;
use rapidspan_types::PortNumber;
use std::time::Duration;

/// Side effects requested by a switch.
///
/// The runner owns the wire, the timer wheel and the filtering database;
/// the switch only describes what should happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // ═══════════════════════════════════════════════════════════════════════
    // Transmission
    // ═══════════════════════════════════════════════════════════════════════
    /// Transmit an encoded BPDU on a port.
    SendBpdu { port: PortNumber, frame: Bytes },

    /// Transmit an encoded GVRP PDU on a port.
    SendGvrpPdu { port: PortNumber, frame: Bytes },

    // ═══════════════════════════════════════════════════════════════════════
    // Filtering database and queues
    // ═══════════════════════════════════════════════════════════════════════
    /// Remove all dynamic filtering entries learned on a port.
    FlushDynamicEntries { port: PortNumber },

    /// Remove dynamic entries on a port older than `age`.
    AgeOutEntries { port: PortNumber, age: Duration },

    /// Drop any frames still queued for egress on a port.
    ClearEgressQueue { port: PortNumber },

    /// The port started or stopped forwarding user traffic.
    PortForwarding { port: PortNumber, forwarding: bool },

    // ═══════════════════════════════════════════════════════════════════════
    // Timers
    // ═══════════════════════════════════════════════════════════════════════
    /// Schedule (or reschedule) a timer.
    SetTimer { id: TimerId, duration: Duration },
}

impl Action {
    /// Get a human-readable name for this action type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::SendBpdu { .. } => "SendBpdu",
            Action::SendGvrpPdu { .. } => "SendGvrpPdu",
            Action::FlushDynamicEntries { .. } => "FlushDynamicEntries",
            Action::AgeOutEntries { .. } => "AgeOutEntries",
            Action::ClearEgressQueue { .. } => "ClearEgressQueue",
            Action::PortForwarding { .. } => "PortForwarding",
            Action::SetTimer { .. } => "SetTimer",
        }
    }
}
