//! The BPDU flags octet.

use rapidspan_types::PortRole;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Flags octet of a Config or RST BPDU.
///
/// ```text
///   bit 7    6     5    4    3 2   1     0
///  ┌──────┬─────┬────┬────┬─────┬─────┬────┐
///  │TC-Ack│Agree│Fwd │Lrn │Role │Prop │ TC │
///  └──────┴─────┴────┴────┴─────┴─────┴────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BpduFlags(pub u8);

impl BpduFlags {
    pub const TC: u8 = 1 << 0;
    pub const PROPOSAL: u8 = 1 << 1;
    pub const ROLE_SHIFT: u8 = 2;
    pub const ROLE_MASK: u8 = 0b11 << Self::ROLE_SHIFT;
    pub const LEARNING: u8 = 1 << 4;
    pub const FORWARDING: u8 = 1 << 5;
    pub const AGREEMENT: u8 = 1 << 6;
    pub const TC_ACK: u8 = 1 << 7;

    pub fn empty() -> Self {
        BpduFlags(0)
    }

    fn with(mut self, bit: u8, on: bool) -> Self {
        if on {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
        self
    }

    pub fn with_tc(self, on: bool) -> Self {
        self.with(Self::TC, on)
    }

    pub fn with_proposal(self, on: bool) -> Self {
        self.with(Self::PROPOSAL, on)
    }

    pub fn with_learning(self, on: bool) -> Self {
        self.with(Self::LEARNING, on)
    }

    pub fn with_forwarding(self, on: bool) -> Self {
        self.with(Self::FORWARDING, on)
    }

    pub fn with_agreement(self, on: bool) -> Self {
        self.with(Self::AGREEMENT, on)
    }

    pub fn with_tc_ack(self, on: bool) -> Self {
        self.with(Self::TC_ACK, on)
    }

    pub fn with_role(mut self, role: PortRole) -> Self {
        self.0 = (self.0 & !Self::ROLE_MASK) | (role.to_bpdu_code() << Self::ROLE_SHIFT);
        self
    }

    pub fn tc(self) -> bool {
        self.0 & Self::TC != 0
    }

    pub fn proposal(self) -> bool {
        self.0 & Self::PROPOSAL != 0
    }

    pub fn learning(self) -> bool {
        self.0 & Self::LEARNING != 0
    }

    pub fn forwarding(self) -> bool {
        self.0 & Self::FORWARDING != 0
    }

    pub fn agreement(self) -> bool {
        self.0 & Self::AGREEMENT != 0
    }

    pub fn tc_ack(self) -> bool {
        self.0 & Self::TC_ACK != 0
    }

    /// Port role advertised by the sender.
    pub fn role(self) -> PortRole {
        PortRole::from_bpdu_code((self.0 & Self::ROLE_MASK) >> Self::ROLE_SHIFT)
    }
}

impl fmt::Display for BpduFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}[role={}", self.0, self.role())?;
        for (set, name) in [
            (self.tc(), "tc"),
            (self.proposal(), "prop"),
            (self.learning(), "lrn"),
            (self.forwarding(), "fwd"),
            (self.agreement(), "agr"),
            (self.tc_ack(), "tcack"),
        ] {
            if set {
                write!(f, " {name}")?;
            }
        }
        f.write_str("]")
    }
}
