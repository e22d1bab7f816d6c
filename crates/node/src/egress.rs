//! Action-collecting fabric with bounded per-port egress queues.

use bytes::Bytes;
use rapidspan_core::Action;
use rapidspan_rstp::{BridgeFabric, TransmitError};
use rapidspan_types::PortNumber;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Collects the actions of one handled event.
///
/// Each port's queue accepts `capacity` frames per event, shared by BPDUs
/// and GVRP PDUs. Forwarding changes are also kept aside so the switch can
/// connect or disconnect the port in GVRP once the bridge call returns.
pub(crate) struct EgressFabric {
    capacity: usize,
    queued: BTreeMap<PortNumber, usize>,
    actions: Vec<Action>,
    forwarding: Vec<(PortNumber, bool)>,
}

impl EgressFabric {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            queued: BTreeMap::new(),
            actions: Vec::new(),
            forwarding: Vec::new(),
        }
    }

    fn enqueue(&mut self, port: PortNumber, action: Action) -> Result<(), TransmitError> {
        let queued = self.queued.entry(port).or_insert(0);
        if *queued >= self.capacity {
            return Err(TransmitError::QueueFull(port));
        }
        *queued += 1;
        self.actions.push(action);
        Ok(())
    }

    pub(crate) fn send_gvrp_pdu(
        &mut self,
        port: PortNumber,
        frame: Bytes,
    ) -> Result<(), TransmitError> {
        self.enqueue(port, Action::SendGvrpPdu { port, frame })
    }

    pub(crate) fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Forwarding changes reported since the last call, in order.
    pub(crate) fn take_forwarding_changes(&mut self) -> Vec<(PortNumber, bool)> {
        std::mem::take(&mut self.forwarding)
    }

    pub(crate) fn into_actions(self) -> Vec<Action> {
        self.actions
    }
}

impl BridgeFabric for EgressFabric {
    fn send_bpdu(&mut self, port: PortNumber, frame: Bytes) -> Result<(), TransmitError> {
        self.enqueue(port, Action::SendBpdu { port, frame })
    }

    fn flush_dynamic_entries(&mut self, port: PortNumber) {
        self.actions.push(Action::FlushDynamicEntries { port });
    }

    fn age_out_entries(&mut self, port: PortNumber, age: Duration) {
        self.actions.push(Action::AgeOutEntries { port, age });
    }

    fn clear_egress_queue(&mut self, port: PortNumber) {
        let before = self.actions.len();
        self.actions.retain(|action| match action {
            Action::SendBpdu { port: p, .. } | Action::SendGvrpPdu { port: p, .. } => *p != port,
            _ => true,
        });
        let dropped = before - self.actions.len();
        if dropped > 0 {
            debug!(port = %port, dropped, "Queued frames dropped");
        }
        self.queued.remove(&port);
        self.actions.push(Action::ClearEgressQueue { port });
    }

    fn forwarding_enabled(&mut self, port: PortNumber) {
        self.forwarding.push((port, true));
        self.actions.push(Action::PortForwarding {
            port,
            forwarding: true,
        });
    }

    fn forwarding_disabled(&mut self, port: PortNumber) {
        self.forwarding.push((port, false));
        self.actions.push(Action::PortForwarding {
            port,
            forwarding: false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_full_after_capacity() {
        let mut fabric = EgressFabric::new(2);
        let port = PortNumber(1);
        assert!(fabric.send_bpdu(port, Bytes::from_static(&[0])).is_ok());
        assert!(fabric.send_gvrp_pdu(port, Bytes::from_static(&[1])).is_ok());
        assert_eq!(
            fabric.send_bpdu(port, Bytes::from_static(&[2])),
            Err(TransmitError::QueueFull(port))
        );
        // Other ports have their own queue.
        assert!(fabric.send_bpdu(PortNumber(2), Bytes::from_static(&[3])).is_ok());
        assert_eq!(fabric.into_actions().len(), 3);
    }

    #[test]
    fn test_clear_drops_queued_frames_and_frees_the_queue() {
        let mut fabric = EgressFabric::new(1);
        let port = PortNumber(1);
        fabric.send_bpdu(port, Bytes::from_static(&[0])).unwrap();
        fabric.send_bpdu(PortNumber(2), Bytes::from_static(&[1])).unwrap();
        fabric.flush_dynamic_entries(port);

        fabric.clear_egress_queue(port);
        assert!(fabric.send_bpdu(port, Bytes::from_static(&[2])).is_ok());

        let actions = fabric.into_actions();
        assert_eq!(
            actions,
            vec![
                Action::SendBpdu {
                    port: PortNumber(2),
                    frame: Bytes::from_static(&[1]),
                },
                Action::FlushDynamicEntries { port },
                Action::ClearEgressQueue { port },
                Action::SendBpdu {
                    port,
                    frame: Bytes::from_static(&[2]),
                },
            ]
        );
    }

    #[test]
    fn test_forwarding_changes_are_reported_twice() {
        let mut fabric = EgressFabric::new(1);
        fabric.forwarding_enabled(PortNumber(3));
        fabric.forwarding_disabled(PortNumber(3));
        assert_eq!(
            fabric.take_forwarding_changes(),
            vec![(PortNumber(3), true), (PortNumber(3), false)]
        );
        assert!(fabric.take_forwarding_changes().is_empty());
        assert_eq!(fabric.into_actions().len(), 2);
    }
}
