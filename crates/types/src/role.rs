//! Port roles and forwarding states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Spanning tree port role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PortRole {
    #[default]
    Disabled,
    AlternateOrBackup,
    Root,
    Designated,
    Unknown,
}

impl PortRole {
    /// Two-bit role code used in RST BPDU flags.
    pub fn to_bpdu_code(self) -> u8 {
        match self {
            PortRole::Unknown | PortRole::Disabled => 0,
            PortRole::AlternateOrBackup => 1,
            PortRole::Root => 2,
            PortRole::Designated => 3,
        }
    }

    /// Inverse of [`PortRole::to_bpdu_code`]. Only the low two bits are read.
    pub fn from_bpdu_code(code: u8) -> Self {
        match code & 0b11 {
            1 => PortRole::AlternateOrBackup,
            2 => PortRole::Root,
            3 => PortRole::Designated,
            _ => PortRole::Unknown,
        }
    }

    /// Root and Designated ports take part in topology change handling.
    pub fn is_active(self) -> bool {
        matches!(self, PortRole::Root | PortRole::Designated)
    }
}

impl fmt::Display for PortRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PortRole::Disabled => "Disabled",
            PortRole::AlternateOrBackup => "AlternateOrBackup",
            PortRole::Root => "Root",
            PortRole::Designated => "Designated",
            PortRole::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Externally visible forwarding state of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PortState {
    #[default]
    Discarding,
    Learning,
    Forwarding,
}
