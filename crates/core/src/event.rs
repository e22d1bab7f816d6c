//! Inbound events.

use bytes::Bytes;
use rapidspan_types::{AttributeDirective, GarpTimer, PortNumber, VlanId};

/// Timer identity. Setting a timer that is already pending replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerId {
    /// The one-second protocol tick.
    Tick,
    /// A per-port GARP timer.
    Garp { port: PortNumber, timer: GarpTimer },
}

/// Everything that can happen to a switch.
#[derive(Debug, Clone)]
pub enum Event {
    // ═══════════════════════════════════════════════════════════════════════
    // Timers
    // ═══════════════════════════════════════════════════════════════════════
    /// One simulated second elapsed.
    Tick,

    /// A GARP timer on a port expired.
    GarpTimer { port: PortNumber, timer: GarpTimer },

    // ═══════════════════════════════════════════════════════════════════════
    // Frames
    // ═══════════════════════════════════════════════════════════════════════
    /// A BPDU arrived on a port.
    BpduReceived { port: PortNumber, frame: Bytes },

    /// A GVRP PDU arrived on a port.
    GvrpPduReceived { port: PortNumber, frame: Bytes },

    // ═══════════════════════════════════════════════════════════════════════
    // Link and management
    // ═══════════════════════════════════════════════════════════════════════
    /// The port's link came up.
    PortEnabled { port: PortNumber },

    /// The port's link went down.
    PortDisabled { port: PortNumber },

    /// The link reports whether it is point-to-point.
    LinkPointToPoint { port: PortNumber, point_to_point: bool },

    /// Apply a registration directive to a VLAN on a port.
    ManageVlan {
        port: PortNumber,
        vlan: VlanId,
        directive: AttributeDirective,
    },
}

impl Event {
    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::Tick => "Tick",
            Event::GarpTimer { .. } => "GarpTimer",
            Event::BpduReceived { .. } => "BpduReceived",
            Event::GvrpPduReceived { .. } => "GvrpPduReceived",
            Event::PortEnabled { .. } => "PortEnabled",
            Event::PortDisabled { .. } => "PortDisabled",
            Event::LinkPointToPoint { .. } => "LinkPointToPoint",
            Event::ManageVlan { .. } => "ManageVlan",
        }
    }

    /// Relative ordering for events scheduled at the same instant.
    ///
    /// Link state changes settle before frames, frames before timers.
    pub fn priority(&self) -> u8 {
        match self {
            Event::PortEnabled { .. }
            | Event::PortDisabled { .. }
            | Event::LinkPointToPoint { .. } => 0,
            Event::ManageVlan { .. } => 1,
            Event::BpduReceived { .. } | Event::GvrpPduReceived { .. } => 2,
            Event::Tick | Event::GarpTimer { .. } => 3,
        }
    }
}
