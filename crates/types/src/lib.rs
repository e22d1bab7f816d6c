//! Core types for rapidspan.
//!
//! Identifiers, priority vectors and timer sets shared by the spanning tree,
//! GARP and node crates. Everything here is plain data with total orders
//! where the protocol defines one.

mod attribute;
mod identifiers;
mod priority;
mod role;
mod times;

pub use attribute::{AttributeDirective, GarpTimer};
pub use identifiers::{MacAddress, ParseMacError, PortId, PortNumber, SwitchId, VlanId};
pub use priority::{Priority, PriorityVector, MAX_PATH_COST};
pub use role::{PortRole, PortState};
pub use times::{decrement_by_one_second, round_to_nearest_second, BpduTime, Times};
