//! The seam between the generic engine and a concrete GARP application.

use crate::TxCursor;
use rapidspan_types::PortNumber;

/// Callbacks a GARP application supplies to the engine.
///
/// Attribute indices are slots in the application's own attribute table;
/// the engine never interprets them.
pub trait GarpApplication {
    /// An attribute became registered on `port`.
    fn join_indication(&mut self, port: PortNumber, index: usize);

    /// An attribute stopped being registered on `port`.
    fn leave_indication(&mut self, port: PortNumber, index: usize);

    /// A registration on `source` was propagated to another connected port.
    fn join_propagated(&mut self, _source: PortNumber, _index: usize) {}

    /// A deregistration on `source` was propagated to another connected port.
    fn leave_propagated(&mut self, _source: PortNumber, _index: usize) {}

    /// Build and send one PDU for `port`, pulling messages from `tx`.
    fn transmit(&mut self, port: PortNumber, tx: &mut TxCursor<'_>);
}
