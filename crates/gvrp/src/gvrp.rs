//! The GVRP application: binds the VLAN registry to a GARP engine.

use crate::pdu::{self, PduRecord};
use crate::registry::{GvrpPortStats, VlanRegistry};
use crate::{GvrpConfig, GvrpError};
use bytes::Bytes;
use rapidspan_garp::{AttributeState, Garp, GipStats, TimerRequest};
use rapidspan_types::{AttributeDirective, GarpTimer, PortNumber, VlanId};
use tracing::{debug, info, warn};

/// GVRP for one switch.
pub struct Gvrp {
    config: GvrpConfig,
    garp: Garp,
    registry: VlanRegistry,
}

impl std::fmt::Debug for Gvrp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gvrp")
            .field("vlans_max", &self.config.vlans_max)
            .field("ports", &self.garp.ports().count())
            .field("registry", &self.registry)
            .finish()
    }
}

impl Gvrp {
    pub fn new(config: GvrpConfig) -> Result<Self, GvrpError> {
        let garp_config = config.garp.clone().with_max_attributes(config.vlans_max);
        let garp = Garp::new(garp_config)?;
        info!(vlans_max = config.vlans_max, "GVRP application created");
        Ok(Self {
            registry: VlanRegistry::new(config.vlans_max),
            config,
            garp,
        })
    }

    pub fn config(&self) -> &GvrpConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Ports
    // ═══════════════════════════════════════════════════════════════════════

    /// Create the port's GID instance and apply its static VLANs and PVID
    /// as fixed registrations.
    pub fn add_port(&mut self, port: PortNumber) -> Result<(), GvrpError> {
        self.garp.create_port(port)?;
        let port_config = self.config.port(port);

        let vlans = port_config
            .static_vlans
            .iter()
            .copied()
            .chain(std::iter::once(port_config.pvid));
        for vlan in vlans {
            if !self.config.is_registrable(vlan) {
                debug!(port = %port, vlan = %vlan, "Skipping unregistrable static VLAN");
                continue;
            }
            let Some(index) = self.entry_for(vlan) else {
                warn!(port = %port, vlan = %vlan, "VLAN database full, static VLAN not registered");
                self.registry.stats_mut(port).database_full += 1;
                continue;
            };
            self.garp.manage_attribute(
                port,
                index,
                AttributeDirective::FixRegistration,
                &mut self.registry,
            )?;
            self.registry.add_member(vlan, port);
        }
        self.garp.do_actions(port, &mut self.registry)?;
        info!(port = %port, pvid = %port_config.pvid, "GVRP port added");
        Ok(())
    }

    /// Destroy the port's GID instance and drop it from every member set.
    pub fn remove_port(&mut self, port: PortNumber) -> Result<(), GvrpError> {
        self.garp.destroy_port(port, &mut self.registry)?;
        self.registry.remove_port(port);
        info!(port = %port, "GVRP port removed");
        Ok(())
    }

    /// The port entered forwarding and joins the propagation ring.
    pub fn connect_port(&mut self, port: PortNumber) -> Result<(), GvrpError> {
        Ok(self.garp.connect_port(port, &mut self.registry)?)
    }

    /// The port left forwarding and leaves the propagation ring.
    pub fn disconnect_port(&mut self, port: PortNumber) -> Result<(), GvrpError> {
        Ok(self.garp.disconnect_port(port, &mut self.registry)?)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Events
    // ═══════════════════════════════════════════════════════════════════════

    /// Process one received GVRP PDU.
    ///
    /// Malformed frames are counted and rejected without touching state.
    pub fn receive_pdu(&mut self, port: PortNumber, frame: &[u8]) -> Result<(), GvrpError> {
        if self.garp.port(port).is_none() {
            return Err(rapidspan_garp::GarpError::UnknownPort(port).into());
        }
        let records = match pdu::decode(frame) {
            Ok(records) => records,
            Err(e) => {
                warn!(port = %port, error = %e, "Discarding malformed GVRP PDU");
                self.registry.stats_mut(port).pdus_discarded += 1;
                return Err(e.into());
            }
        };

        for record in records {
            self.registry.stats_mut(port).received.count(&record);
            match record {
                PduRecord::LeaveAll => self.garp.receive_leave_all(port)?,
                PduRecord::Vlan { vlan, message } => {
                    if !self.config.is_registrable(vlan) {
                        debug!(port = %port, vlan = %vlan, "Ignoring unregistrable VLAN");
                        continue;
                    }
                    let event = message.received_event();
                    let index = match self.registry.find_entry(vlan) {
                        Some(index) => index,
                        None if message.is_join() => match self.entry_for(vlan) {
                            Some(index) => index,
                            None => {
                                warn!(port = %port, vlan = %vlan, "VLAN database full");
                                self.registry.stats_mut(port).database_full += 1;
                                continue;
                            }
                        },
                        // Nothing to withdraw for a VLAN we never knew.
                        None => continue,
                    };
                    self.garp
                        .receive_msg(port, index, event, &mut self.registry)?;
                }
            }
        }
        self.garp.do_actions(port, &mut self.registry)?;
        Ok(())
    }

    /// Apply a management directive to one VLAN on one port.
    pub fn manage_vlan(
        &mut self,
        port: PortNumber,
        vlan: VlanId,
        directive: AttributeDirective,
    ) -> Result<(), GvrpError> {
        if !self.config.is_registrable(vlan) {
            return Err(GvrpError::InvalidVlan(vlan));
        }
        if self.garp.port(port).is_none() {
            return Err(rapidspan_garp::GarpError::UnknownPort(port).into());
        }
        let index = self.entry_for(vlan).ok_or(GvrpError::DatabaseFull(vlan))?;
        self.garp
            .manage_attribute(port, index, directive, &mut self.registry)?;
        self.garp.do_actions(port, &mut self.registry)?;
        Ok(())
    }

    /// Report a GARP timer expiry.
    pub fn timer_expired(&mut self, port: PortNumber, timer: GarpTimer) -> Result<(), GvrpError> {
        Ok(self.garp.timer_expired(port, timer, &mut self.registry)?)
    }

    /// Find the VLAN's GVD slot, creating it and recycling an unused slot if
    /// the database is full.
    fn entry_for(&mut self, vlan: VlanId) -> Option<usize> {
        if let Some(index) = self.registry.find_entry(vlan) {
            return Some(index);
        }
        let index = match self.registry.create_entry(vlan) {
            Some(index) => index,
            None => {
                let unused = self.garp.find_unused(0)?;
                self.registry.delete_entry(unused);
                self.registry.create_entry(vlan)?
            }
        };
        self.garp.claim_index(index);
        Some(index)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Outputs and queries
    // ═══════════════════════════════════════════════════════════════════════

    /// Drain the GARP timers started since the last call.
    pub fn take_timer_requests(&mut self) -> Vec<TimerRequest> {
        self.garp.take_timer_requests()
    }

    /// Drain the PDUs built since the last call.
    pub fn take_outbound(&mut self) -> Vec<(PortNumber, Bytes)> {
        self.registry.take_outbox()
    }

    pub fn attribute_state(&self, port: PortNumber, vlan: VlanId) -> Option<AttributeState> {
        let index = self.registry.find_entry(vlan)?;
        self.garp.attribute_state(port, index)
    }

    pub fn is_member(&self, vlan: VlanId, port: PortNumber) -> bool {
        self.registry.is_member(vlan, port)
    }

    pub fn members(&self, vlan: VlanId) -> Vec<PortNumber> {
        self.registry.members(vlan).collect()
    }

    pub fn vlans(&self) -> Vec<VlanId> {
        self.registry.vlans().collect()
    }

    pub fn port_stats(&self, port: PortNumber) -> GvrpPortStats {
        self.registry.stats(port)
    }

    pub fn gip_stats(&self) -> GipStats {
        self.garp.stats()
    }

    pub fn registry(&self) -> &VlanRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GvrpPortConfig, PduError};
    use rapidspan_garp::{
        ApplicantState, AttributeMessage, GarpConfig, RegistrarManagement, RegistrarStatus,
    };
    use tracing_test::traced_test;

    fn join_in(vlan: u16) -> PduRecord {
        PduRecord::Vlan {
            vlan: VlanId(vlan),
            message: AttributeMessage::JoinIn,
        }
    }

    fn make_test_gvrp(ports: u8) -> Gvrp {
        let config = GvrpConfig::default()
            .with_garp(GarpConfig::default().with_seed(7))
            .with_port(
                PortNumber(1),
                GvrpPortConfig::default().with_static_vlans([VlanId(100)]),
            );
        let mut gvrp = Gvrp::new(config).unwrap();
        for n in 1..=ports {
            gvrp.add_port(PortNumber(n)).unwrap();
        }
        for n in 1..=ports {
            gvrp.connect_port(PortNumber(n)).unwrap();
        }
        gvrp.take_timer_requests();
        gvrp.take_outbound();
        gvrp
    }

    #[traced_test]
    #[test]
    fn test_add_port_fixes_pvid_and_static_vlans() {
        let gvrp = make_test_gvrp(2);

        assert!(gvrp.is_member(VlanId(1), PortNumber(1)));
        assert!(gvrp.is_member(VlanId(1), PortNumber(2)));
        assert!(gvrp.is_member(VlanId(100), PortNumber(1)));
        assert!(!gvrp.is_member(VlanId(100), PortNumber(2)));

        let state = gvrp.attribute_state(PortNumber(1), VlanId(100)).unwrap();
        assert_eq!(state.registrar_management, RegistrarManagement::Fixed);
        let state = gvrp.attribute_state(PortNumber(2), VlanId(100)).unwrap();
        assert_eq!(state.registrar, RegistrarStatus::Empty);
    }

    #[traced_test]
    #[test]
    fn test_received_join_registers_new_vlan() {
        let mut gvrp = make_test_gvrp(3);
        gvrp.receive_pdu(PortNumber(3), &pdu::encode(&[join_in(20)]))
            .unwrap();

        assert_eq!(gvrp.members(VlanId(20)), vec![PortNumber(3)]);
        assert_eq!(gvrp.port_stats(PortNumber(3)).received.join_in, 1);

        // The first registration is declared on every other connected port.
        for n in [1, 2] {
            let state = gvrp.attribute_state(PortNumber(n), VlanId(20)).unwrap();
            assert!(matches!(state.applicant, ApplicantState::Vp | ApplicantState::Aa));
            assert_eq!(state.registrar, RegistrarStatus::Empty);
        }
        assert!(!gvrp.is_member(VlanId(20), PortNumber(1)));
    }

    #[test]
    fn test_leave_for_unknown_vlan_is_ignored() {
        let mut gvrp = make_test_gvrp(1);
        let frame = pdu::encode(&[PduRecord::Vlan {
            vlan: VlanId(42),
            message: AttributeMessage::LeaveEmpty,
        }]);
        gvrp.receive_pdu(PortNumber(1), &frame).unwrap();
        assert!(gvrp.registry().find_entry(VlanId(42)).is_none());
        assert_eq!(gvrp.port_stats(PortNumber(1)).received.leave_empty, 1);
    }

    #[test]
    fn test_reserved_and_invalid_vlans_never_registered() {
        let config = GvrpConfig::default().with_reserved_vlans([VlanId(30)]);
        let mut gvrp = Gvrp::new(config).unwrap();
        gvrp.add_port(PortNumber(1)).unwrap();

        gvrp.receive_pdu(PortNumber(1), &pdu::encode(&[join_in(30), join_in(4095)]))
            .unwrap();
        assert!(gvrp.registry().find_entry(VlanId(30)).is_none());
        assert!(gvrp.registry().find_entry(VlanId(4095)).is_none());
        assert_eq!(
            gvrp.manage_vlan(PortNumber(1), VlanId(30), AttributeDirective::FixRegistration),
            Err(GvrpError::InvalidVlan(VlanId(30)))
        );
    }

    #[traced_test]
    #[test]
    fn test_full_database_counts_and_recycles() {
        let config = GvrpConfig::default().with_vlans_max(2);
        let mut gvrp = Gvrp::new(config).unwrap();
        gvrp.add_port(PortNumber(1)).unwrap();
        gvrp.connect_port(PortNumber(1)).unwrap();

        // PVID 1 takes a slot; VLAN 2 takes the other.
        gvrp.receive_pdu(PortNumber(1), &pdu::encode(&[join_in(2), join_in(3)]))
            .unwrap();
        assert!(gvrp.is_member(VlanId(2), PortNumber(1)));
        assert!(!gvrp.is_member(VlanId(3), PortNumber(1)));
        assert_eq!(gvrp.port_stats(PortNumber(1)).database_full, 1);
        assert_eq!(
            gvrp.manage_vlan(PortNumber(1), VlanId(4), AttributeDirective::NormalRegistration),
            Err(GvrpError::DatabaseFull(VlanId(4)))
        );
    }

    #[test]
    fn test_malformed_pdu_counted_and_rejected() {
        let mut gvrp = make_test_gvrp(1);
        let err = gvrp.receive_pdu(PortNumber(1), &[0x00, 0x07]).unwrap_err();
        assert_eq!(err, GvrpError::Pdu(PduError::BadProtocolId(7)));
        assert_eq!(gvrp.port_stats(PortNumber(1)).pdus_discarded, 1);
    }

    #[test]
    fn test_remove_port_drops_memberships() {
        let mut gvrp = make_test_gvrp(2);
        gvrp.remove_port(PortNumber(1)).unwrap();
        assert!(!gvrp.is_member(VlanId(100), PortNumber(1)));
        assert_eq!(gvrp.members(VlanId(1)), vec![PortNumber(2)]);
        assert!(gvrp.remove_port(PortNumber(1)).is_err());
    }

    #[test]
    fn test_forbid_withdraws_registration() {
        let mut gvrp = make_test_gvrp(2);
        gvrp.receive_pdu(PortNumber(2), &pdu::encode(&[join_in(20)]))
            .unwrap();
        assert!(gvrp.is_member(VlanId(20), PortNumber(2)));

        gvrp.manage_vlan(PortNumber(2), VlanId(20), AttributeDirective::ForbidRegistration)
            .unwrap();
        assert!(!gvrp.is_member(VlanId(20), PortNumber(2)));
        let state = gvrp.attribute_state(PortNumber(2), VlanId(20)).unwrap();
        assert_eq!(state.registrar_management, RegistrarManagement::Forbidden);
    }
}
