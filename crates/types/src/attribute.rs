//! Attribute registration vocabulary shared by GARP applications and the node.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Management directive applied to one attribute on one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeDirective {
    /// Applicant takes part in the protocol normally.
    NormalOperation,
    /// Applicant stops declaring.
    NoProtocol,
    /// Registrar follows received messages.
    NormalRegistration,
    /// Registrar is pinned registered.
    FixRegistration,
    /// Registrar is pinned deregistered.
    ForbidRegistration,
}

/// The four per-port GARP timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GarpTimer {
    Join,
    Leave,
    LeaveAll,
    Hold,
}

impl fmt::Display for GarpTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GarpTimer::Join => "join",
            GarpTimer::Leave => "leave",
            GarpTimer::LeaveAll => "leaveall",
            GarpTimer::Hold => "hold",
        };
        f.write_str(name)
    }
}
