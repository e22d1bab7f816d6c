//! VLAN database and dynamic member sets.
//!
//! The GVD maps VLAN ids to GID attribute slots. Member sets record which
//! ports currently have each VLAN registered. The registry is the
//! [`GarpApplication`] the GARP engine calls back into.

use crate::pdu::{PduBuilder, PduRecord};
use bytes::Bytes;
use indexmap::IndexMap;
use rapidspan_garp::{AttributeMessage, GarpApplication, Transmission, TxCursor};
use rapidspan_types::{PortNumber, VlanId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Per-event message counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCounters {
    pub join_empty: u64,
    pub join_in: u64,
    pub leave_empty: u64,
    pub leave_in: u64,
    pub empty: u64,
    pub leave_all: u64,
}

impl EventCounters {
    pub(crate) fn count(&mut self, record: &PduRecord) {
        match record {
            PduRecord::LeaveAll => self.leave_all += 1,
            PduRecord::Vlan { message, .. } => match message {
                AttributeMessage::JoinEmpty => self.join_empty += 1,
                AttributeMessage::JoinIn => self.join_in += 1,
                AttributeMessage::LeaveEmpty => self.leave_empty += 1,
                AttributeMessage::LeaveIn => self.leave_in += 1,
                AttributeMessage::Empty => self.empty += 1,
            },
        }
    }
}

/// GVRP counters for one port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GvrpPortStats {
    pub received: EventCounters,
    pub transmitted: EventCounters,
    pub pdus_sent: u64,
    pub pdus_discarded: u64,
    pub database_full: u64,
}

/// The GVD, member sets, stats and outgoing PDU queue.
#[derive(Debug, Clone)]
pub struct VlanRegistry {
    /// Attribute slot to VLAN id.
    gvd: Vec<Option<VlanId>>,
    members: IndexMap<VlanId, BTreeSet<PortNumber>>,
    stats: BTreeMap<PortNumber, GvrpPortStats>,
    outbox: Vec<(PortNumber, Bytes)>,
}

impl VlanRegistry {
    pub fn new(vlans_max: usize) -> Self {
        Self {
            gvd: vec![None; vlans_max],
            members: IndexMap::new(),
            stats: BTreeMap::new(),
            outbox: Vec::new(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // GVD
    // ═══════════════════════════════════════════════════════════════════════

    pub fn find_entry(&self, vlan: VlanId) -> Option<usize> {
        self.gvd.iter().position(|slot| *slot == Some(vlan))
    }

    /// Put `vlan` in the first free slot.
    pub fn create_entry(&mut self, vlan: VlanId) -> Option<usize> {
        let index = self.gvd.iter().position(Option::is_none)?;
        self.gvd[index] = Some(vlan);
        debug!(vlan = %vlan, index = index, "GVD entry created");
        Some(index)
    }

    pub fn delete_entry(&mut self, index: usize) -> Option<VlanId> {
        let vlan = self.gvd.get_mut(index)?.take()?;
        if self.members.get(&vlan).is_some_and(BTreeSet::is_empty) {
            self.members.shift_remove(&vlan);
        }
        debug!(vlan = %vlan, index = index, "GVD entry deleted");
        Some(vlan)
    }

    pub fn get_key(&self, index: usize) -> Option<VlanId> {
        self.gvd.get(index).copied().flatten()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Member sets
    // ═══════════════════════════════════════════════════════════════════════

    pub fn add_member(&mut self, vlan: VlanId, port: PortNumber) {
        if self.members.entry(vlan).or_default().insert(port) {
            debug!(vlan = %vlan, port = %port, "Port added to VLAN member set");
        }
    }

    pub fn remove_member(&mut self, vlan: VlanId, port: PortNumber) {
        if let Some(set) = self.members.get_mut(&vlan) {
            if set.remove(&port) {
                debug!(vlan = %vlan, port = %port, "Port removed from VLAN member set");
            }
        }
    }

    /// Drop `port` from every member set.
    pub fn remove_port(&mut self, port: PortNumber) {
        for set in self.members.values_mut() {
            set.remove(&port);
        }
    }

    pub fn is_member(&self, vlan: VlanId, port: PortNumber) -> bool {
        self.members.get(&vlan).is_some_and(|set| set.contains(&port))
    }

    pub fn members(&self, vlan: VlanId) -> impl Iterator<Item = PortNumber> + '_ {
        self.members.get(&vlan).into_iter().flatten().copied()
    }

    /// VLANs with at least one member, in first-registration order.
    pub fn vlans(&self) -> impl Iterator<Item = VlanId> + '_ {
        self.members
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(vlan, _)| *vlan)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Stats and outbox
    // ═══════════════════════════════════════════════════════════════════════

    pub fn stats(&self, port: PortNumber) -> GvrpPortStats {
        self.stats.get(&port).copied().unwrap_or_default()
    }

    pub(crate) fn stats_mut(&mut self, port: PortNumber) -> &mut GvrpPortStats {
        self.stats.entry(port).or_default()
    }

    pub(crate) fn take_outbox(&mut self) -> Vec<(PortNumber, Bytes)> {
        std::mem::take(&mut self.outbox)
    }
}

impl GarpApplication for VlanRegistry {
    fn join_indication(&mut self, port: PortNumber, index: usize) {
        if let Some(vlan) = self.get_key(index) {
            self.add_member(vlan, port);
        }
    }

    fn leave_indication(&mut self, port: PortNumber, index: usize) {
        if let Some(vlan) = self.get_key(index) {
            self.remove_member(vlan, port);
        }
    }

    fn transmit(&mut self, port: PortNumber, tx: &mut TxCursor<'_>) {
        let mut pdu = PduBuilder::new();
        while let Some(transmission) = tx.next_tx() {
            let record = match transmission {
                Transmission::LeaveAll => PduRecord::LeaveAll,
                Transmission::Attribute { index, message } => match self.get_key(index) {
                    Some(vlan) => PduRecord::Vlan { vlan, message },
                    None => continue,
                },
            };
            if !pdu.fits(&record) {
                tx.untransmit();
                break;
            }
            pdu.push(record);
            self.stats_mut(port).transmitted.count(&record);
            if record == PduRecord::LeaveAll {
                break;
            }
        }

        if pdu.is_empty() {
            return;
        }
        let frame = pdu.finish();
        debug!(port = %port, len = frame.len(), "Sending GVRP PDU");
        self.stats_mut(port).pdus_sent += 1;
        self.outbox.push((port, frame));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gvd_reuses_freed_slot() {
        let mut registry = VlanRegistry::new(2);
        assert_eq!(registry.create_entry(VlanId(10)), Some(0));
        assert_eq!(registry.create_entry(VlanId(20)), Some(1));
        assert_eq!(registry.create_entry(VlanId(30)), None);

        assert_eq!(registry.delete_entry(0), Some(VlanId(10)));
        assert_eq!(registry.find_entry(VlanId(10)), None);
        assert_eq!(registry.create_entry(VlanId(30)), Some(0));
        assert_eq!(registry.get_key(0), Some(VlanId(30)));
        assert_eq!(registry.get_key(5), None);
    }

    #[test]
    fn test_indications_update_member_sets() {
        let mut registry = VlanRegistry::new(4);
        let index = registry.create_entry(VlanId(7)).unwrap();

        registry.join_indication(PortNumber(1), index);
        registry.join_indication(PortNumber(2), index);
        assert!(registry.is_member(VlanId(7), PortNumber(1)));
        assert_eq!(
            registry.members(VlanId(7)).collect::<Vec<_>>(),
            vec![PortNumber(1), PortNumber(2)]
        );

        registry.leave_indication(PortNumber(1), index);
        assert!(!registry.is_member(VlanId(7), PortNumber(1)));

        registry.remove_port(PortNumber(2));
        assert_eq!(registry.vlans().count(), 0);
    }
}
