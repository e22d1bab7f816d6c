//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 48-bit IEEE 802 MAC address.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    /// The all-zero address.
    pub const ZERO: Self = MacAddress([0; 6]);

    /// Build a locally administered address from a small integer.
    ///
    /// Handy for simulations where switches are numbered.
    pub fn from_index(index: u32) -> Self {
        let b = index.to_be_bytes();
        MacAddress([0x02, 0x00, b[0], b[1], b[2], b[3]])
    }

    /// Get the bytes as a slice.
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// Error parsing a textual MAC address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseMacError {
    #[error("MAC address must have 6 octets, found {0}")]
    WrongOctetCount(usize),

    #[error("Invalid MAC octet: {0}")]
    InvalidOctet(String),
}

impl FromStr for MacAddress {
    type Err = ParseMacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split([':', '-']).collect();
        if parts.len() != 6 {
            return Err(ParseMacError::WrongOctetCount(parts.len()));
        }
        let mut out = [0u8; 6];
        for (slot, part) in out.iter_mut().zip(parts) {
            *slot = u8::from_str_radix(part, 16)
                .map_err(|_| ParseMacError::InvalidOctet(part.to_string()))?;
        }
        Ok(MacAddress(out))
    }
}

/// Bridge identifier.
///
/// Ordering is lexicographic: priority first, then address. Lower is better.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct SwitchId {
    pub priority: u16,
    pub address: MacAddress,
}

impl SwitchId {
    pub fn new(priority: u16, address: MacAddress) -> Self {
        Self { priority, address }
    }
}

impl fmt::Display for SwitchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.priority, self.address)
    }
}

/// Physical port number on a switch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PortNumber(pub u8);

impl fmt::Display for PortNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Port({})", self.0)
    }
}

/// Port identifier as carried in BPDUs.
///
/// Ordering is priority first, then port number. Lower is better.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct PortId {
    pub priority: u8,
    pub number: PortNumber,
}

impl PortId {
    pub fn new(priority: u8, number: PortNumber) -> Self {
        Self { priority, number }
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.priority, self.number.0)
    }
}

/// IEEE 802.1Q VLAN identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct VlanId(pub u16);

impl VlanId {
    /// Lowest usable VLAN id.
    pub const MIN: u16 = 1;

    /// Highest usable VLAN id (4095 is reserved by 802.1Q).
    pub const MAX: u16 = 4094;

    /// Default port VLAN id.
    pub const DEFAULT_PVID: Self = VlanId(1);

    /// Whether this id may be registered.
    pub fn is_valid(self) -> bool {
        (Self::MIN..=Self::MAX).contains(&self.0)
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vlan({})", self.0)
    }
}
