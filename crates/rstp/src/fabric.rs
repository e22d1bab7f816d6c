//! The switch fabric seen from the spanning tree.

use crate::TransmitError;
use bytes::Bytes;
use rapidspan_types::PortNumber;
use std::time::Duration;

/// Forwarding-plane operations the bridge drives.
///
/// Every call happens synchronously inside the sweep that caused it. Nothing
/// here may call back into the bridge.
pub trait BridgeFabric {
    /// Queue a BPDU for transmission on `port`.
    fn send_bpdu(&mut self, port: PortNumber, frame: Bytes) -> Result<(), TransmitError>;

    /// Remove dynamic filtering entries learned on `port`.
    fn flush_dynamic_entries(&mut self, port: PortNumber);

    /// Age out dynamic entries on `port` older than `age`.
    fn age_out_entries(&mut self, port: PortNumber, age: Duration);

    /// Drop frames still waiting in the egress queue of `port`.
    fn clear_egress_queue(&mut self, port: PortNumber);

    /// `port` entered Forwarding.
    fn forwarding_enabled(&mut self, port: PortNumber);

    /// `port` left Forwarding (or was forced to Discarding).
    fn forwarding_disabled(&mut self, port: PortNumber);
}
