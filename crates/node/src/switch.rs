//! The switch state machine.

use crate::egress::EgressFabric;
use crate::{SwitchConfig, SwitchError};
use bytes::Bytes;
use rapidspan_core::{Action, Event, StateMachine, TimerId};
use rapidspan_garp::GarpError;
use rapidspan_gvrp::{Gvrp, GvrpError};
use rapidspan_rstp::{Bridge, BridgeFabric};
use rapidspan_types::{AttributeDirective, GarpTimer, PortNumber, SwitchId, VlanId};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Interval of the protocol tick.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// One switch: an RSTP bridge plus an optional GVRP application.
///
/// The bridge decides which ports forward. GVRP only propagates
/// registrations between ports that are forwarding, so every forwarding
/// change reported by the bridge connects or disconnects the port in GIP.
pub struct Switch {
    bridge: Bridge,
    gvrp: Option<Gvrp>,
    egress_capacity: usize,
    now: Duration,
}

impl std::fmt::Debug for Switch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Switch")
            .field("id", &self.bridge.switch_id())
            .field("gvrp", &self.gvrp.is_some())
            .field("now", &self.now)
            .finish()
    }
}

impl Switch {
    /// Build a switch. Every configured port starts disabled.
    pub fn new(config: SwitchConfig) -> Result<Self, SwitchError> {
        let mut bridge = Bridge::new(config.bridge)?;
        for (number, port_config) in config.ports {
            bridge.add_port(number, port_config)?;
        }
        let gvrp = config.gvrp.map(Gvrp::new).transpose()?;
        Ok(Self {
            bridge,
            gvrp,
            egress_capacity: config.egress_capacity,
            now: Duration::ZERO,
        })
    }

    /// Actions to perform when the switch is powered on.
    pub fn start(&mut self) -> Vec<Action> {
        vec![Action::SetTimer {
            id: TimerId::Tick,
            duration: TICK_INTERVAL,
        }]
    }

    pub fn id(&self) -> SwitchId {
        self.bridge.switch_id()
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn gvrp(&self) -> Option<&Gvrp> {
        self.gvrp.as_ref()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Event handlers
    // ═══════════════════════════════════════════════════════════════════════

    fn on_tick(&mut self, fabric: &mut EgressFabric) {
        self.bridge.tick(fabric);
        fabric.push(Action::SetTimer {
            id: TimerId::Tick,
            duration: TICK_INTERVAL,
        });
    }

    fn on_garp_timer(&mut self, port: PortNumber, timer: GarpTimer) {
        let Some(gvrp) = self.gvrp.as_mut() else {
            return;
        };
        match gvrp.timer_expired(port, timer) {
            Ok(()) => {}
            // The port went down after the timer was set.
            Err(GvrpError::Garp(GarpError::UnknownPort(_))) => {
                trace!(port = %port, timer = %timer, "Stale GARP timer ignored");
            }
            Err(e) => warn!(port = %port, timer = %timer, error = %e, "GARP timer failed"),
        }
    }

    fn on_bpdu(&mut self, port: PortNumber, frame: &Bytes, fabric: &mut EgressFabric) {
        if let Err(e) = self.bridge.receive_bpdu(port, frame, fabric) {
            warn!(port = %port, error = %e, "BPDU not processed");
        }
    }

    fn on_gvrp_pdu(&mut self, port: PortNumber, frame: &Bytes) {
        let Some(gvrp) = self.gvrp.as_mut() else {
            trace!(port = %port, "GVRP PDU ignored, GVRP not running");
            return;
        };
        match gvrp.receive_pdu(port, frame) {
            Ok(()) => {}
            Err(GvrpError::Garp(GarpError::UnknownPort(_))) => {
                debug!(port = %port, "GVRP PDU on disabled port ignored");
            }
            Err(e) => warn!(port = %port, error = %e, "GVRP PDU dropped"),
        }
    }

    /// GVRP first so the port can be connected as soon as the bridge lets
    /// it forward.
    fn on_port_enabled(&mut self, port: PortNumber, fabric: &mut EgressFabric) {
        if self.bridge.port(port).is_none() {
            warn!(port = %port, "Enable for unknown port ignored");
            return;
        }
        if let Some(gvrp) = self.gvrp.as_mut() {
            if let Err(e) = gvrp.add_port(port) {
                warn!(port = %port, error = %e, "GVRP port not added");
            }
        }
        if let Err(e) = self.bridge.enable_port(port, fabric) {
            warn!(port = %port, error = %e, "Port not enabled");
        }
    }

    fn on_port_disabled(&mut self, port: PortNumber, fabric: &mut EgressFabric) {
        if self.bridge.port(port).is_none() {
            warn!(port = %port, "Disable for unknown port ignored");
            return;
        }
        fabric.clear_egress_queue(port);
        if let Err(e) = self.bridge.disable_port(port, fabric) {
            warn!(port = %port, error = %e, "Port not disabled");
        }
        // Disconnect before the GID port goes away.
        self.apply_forwarding_changes(fabric);
        if let Some(gvrp) = self.gvrp.as_mut() {
            match gvrp.remove_port(port) {
                Ok(()) | Err(GvrpError::Garp(GarpError::UnknownPort(_))) => {}
                Err(e) => warn!(port = %port, error = %e, "GVRP port not removed"),
            }
        }
    }

    fn on_link_point_to_point(
        &mut self,
        port: PortNumber,
        point_to_point: bool,
        fabric: &mut EgressFabric,
    ) {
        if let Err(e) = self
            .bridge
            .set_link_point_to_point(port, point_to_point, fabric)
        {
            warn!(port = %port, error = %e, "Link status not applied");
        }
    }

    fn on_manage_vlan(&mut self, port: PortNumber, vlan: VlanId, directive: AttributeDirective) {
        let Some(gvrp) = self.gvrp.as_mut() else {
            warn!(port = %port, vlan = %vlan, "VLAN directive ignored, GVRP not running");
            return;
        };
        if let Err(e) = gvrp.manage_vlan(port, vlan, directive) {
            warn!(port = %port, vlan = %vlan, directive = ?directive, error = %e, "VLAN directive refused");
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // GVRP plumbing
    // ═══════════════════════════════════════════════════════════════════════

    /// Mirror the bridge's forwarding decisions into the GIP ring.
    fn apply_forwarding_changes(&mut self, fabric: &mut EgressFabric) {
        let changes = fabric.take_forwarding_changes();
        let Some(gvrp) = self.gvrp.as_mut() else {
            return;
        };
        for (port, forwarding) in changes {
            let result = if forwarding {
                gvrp.connect_port(port)
            } else {
                gvrp.disconnect_port(port)
            };
            if let Err(e) = result {
                warn!(port = %port, forwarding, error = %e, "GIP connection not updated");
            }
        }
    }

    /// Turn GVRP output into actions.
    fn drain_gvrp(&mut self, fabric: &mut EgressFabric) {
        let Some(gvrp) = self.gvrp.as_mut() else {
            return;
        };
        for request in gvrp.take_timer_requests() {
            fabric.push(Action::SetTimer {
                id: TimerId::Garp {
                    port: request.port,
                    timer: request.timer,
                },
                duration: request.duration,
            });
        }
        for (port, frame) in gvrp.take_outbound() {
            if let Err(e) = fabric.send_gvrp_pdu(port, frame) {
                warn!(port = %port, error = %e, "GVRP PDU transmit failed");
            }
        }
    }
}

impl StateMachine for Switch {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        trace!(switch = %self.bridge.switch_id(), event = event.type_name(), "Handling event");
        let mut fabric = EgressFabric::new(self.egress_capacity);

        match event {
            Event::Tick => self.on_tick(&mut fabric),
            Event::GarpTimer { port, timer } => self.on_garp_timer(port, timer),
            Event::BpduReceived { port, frame } => self.on_bpdu(port, &frame, &mut fabric),
            Event::GvrpPduReceived { port, frame } => self.on_gvrp_pdu(port, &frame),
            Event::PortEnabled { port } => self.on_port_enabled(port, &mut fabric),
            Event::PortDisabled { port } => self.on_port_disabled(port, &mut fabric),
            Event::LinkPointToPoint {
                port,
                point_to_point,
            } => self.on_link_point_to_point(port, point_to_point, &mut fabric),
            Event::ManageVlan {
                port,
                vlan,
                directive,
            } => self.on_manage_vlan(port, vlan, directive),
        }

        self.apply_forwarding_changes(&mut fabric);
        self.drain_gvrp(&mut fabric);
        fabric.into_actions()
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    fn now(&self) -> Duration {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapidspan_gvrp::{GvrpConfig, GvrpPortConfig};
    use rapidspan_rstp::{BridgeConfig, PortConfig};
    use rapidspan_types::{MacAddress, PortRole, PortState};
    use tracing_test::traced_test;

    fn make_test_config() -> SwitchConfig {
        SwitchConfig::default()
            .with_bridge(BridgeConfig::default().with_address(MacAddress::from_index(1)))
            .with_default_ports(2)
    }

    fn make_test_gvrp_switch() -> Switch {
        let edge = PortConfig::default().with_admin_edge(true);
        let gvrp = GvrpConfig::default().with_port(
            PortNumber(1),
            GvrpPortConfig::default().with_static_vlans([VlanId(10)]),
        );
        let config = make_test_config()
            .with_port(PortNumber(1), edge.clone())
            .with_port(PortNumber(2), edge)
            .with_gvrp(gvrp);
        Switch::new(config).unwrap()
    }

    fn has_timer(actions: &[Action], port: PortNumber, timer: GarpTimer) -> bool {
        actions.iter().any(|action| {
            matches!(action, Action::SetTimer { id: TimerId::Garp { port: p, timer: t }, .. }
                if *p == port && *t == timer)
        })
    }

    fn sent_bpdus(actions: &[Action]) -> usize {
        actions
            .iter()
            .filter(|action| matches!(action, Action::SendBpdu { .. }))
            .count()
    }

    #[test]
    fn test_invalid_bridge_config_refused() {
        let config = make_test_config().with_bridge(BridgeConfig::default().with_priority(100));
        assert!(matches!(
            Switch::new(config),
            Err(SwitchError::Bridge(_))
        ));
    }

    #[test]
    fn test_start_schedules_tick() {
        let mut switch = Switch::new(make_test_config()).unwrap();
        assert_eq!(
            switch.start(),
            vec![Action::SetTimer {
                id: TimerId::Tick,
                duration: Duration::from_secs(1),
            }]
        );
    }

    #[traced_test]
    #[test]
    fn test_tick_reschedules_and_ages_out() {
        let mut switch = Switch::new(make_test_config()).unwrap();
        switch.handle(Event::PortEnabled { port: PortNumber(1) });

        let actions = switch.handle(Event::Tick);

        assert!(actions.contains(&Action::SetTimer {
            id: TimerId::Tick,
            duration: Duration::from_secs(1),
        }));
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::AgeOutEntries { port, .. } if *port == PortNumber(1))));
        // Port 2 is still down.
        assert!(!actions
            .iter()
            .any(|a| matches!(a, Action::AgeOutEntries { port, .. } if *port == PortNumber(2))));
    }

    #[traced_test]
    #[test]
    fn test_lone_port_sends_bpdus() {
        let mut switch = Switch::new(make_test_config()).unwrap();
        let mut sent = sent_bpdus(&switch.handle(Event::PortEnabled { port: PortNumber(1) }));
        for _ in 0..4 {
            sent += sent_bpdus(&switch.handle(Event::Tick));
        }
        assert!(sent > 0);
        assert_eq!(switch.bridge().role(PortNumber(1)), Some(PortRole::Designated));
    }

    #[traced_test]
    #[test]
    fn test_egress_capacity_refuses_bpdus() {
        let config = make_test_config().with_egress_capacity(0);
        let mut switch = Switch::new(config).unwrap();
        let mut sent = sent_bpdus(&switch.handle(Event::PortEnabled { port: PortNumber(1) }));
        for _ in 0..4 {
            sent += sent_bpdus(&switch.handle(Event::Tick));
        }
        assert_eq!(sent, 0);
        let stats = switch.bridge().stats(PortNumber(1)).unwrap();
        assert!(stats.tx_failures > 0);
        assert!(logs_contain("BPDU transmit failed"));
    }

    #[traced_test]
    #[test]
    fn test_edge_ports_connect_gvrp_and_propagate() {
        let mut switch = make_test_gvrp_switch();

        let actions = switch.handle(Event::PortEnabled { port: PortNumber(1) });
        assert!(actions.contains(&Action::PortForwarding {
            port: PortNumber(1),
            forwarding: true,
        }));
        assert!(has_timer(&actions, PortNumber(1), GarpTimer::LeaveAll));

        let gvrp = switch.gvrp().unwrap();
        assert!(gvrp.is_member(VlanId(10), PortNumber(1)));

        // Port 1's fixed registration is declared on port 2 once it connects.
        let actions = switch.handle(Event::PortEnabled { port: PortNumber(2) });
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::SendGvrpPdu { port, .. } if *port == PortNumber(2))));
        assert!(logs_contain("GIP port connected"));
    }

    #[traced_test]
    #[test]
    fn test_disable_clears_egress_first() {
        let mut switch = make_test_gvrp_switch();
        switch.handle(Event::PortEnabled { port: PortNumber(1) });

        let actions = switch.handle(Event::PortDisabled { port: PortNumber(1) });

        assert_eq!(
            actions.first(),
            Some(&Action::ClearEgressQueue {
                port: PortNumber(1)
            })
        );
        assert!(actions.contains(&Action::PortForwarding {
            port: PortNumber(1),
            forwarding: false,
        }));
        assert_eq!(switch.bridge().state(PortNumber(1)), Some(PortState::Discarding));
        assert!(!switch
            .gvrp()
            .unwrap()
            .is_member(VlanId(10), PortNumber(1)));
    }

    #[traced_test]
    #[test]
    fn test_stale_garp_timer_is_ignored() {
        let mut switch = make_test_gvrp_switch();
        let actions = switch.handle(Event::GarpTimer {
            port: PortNumber(2),
            timer: GarpTimer::Join,
        });
        assert!(actions.is_empty());
        assert!(!logs_contain("GARP timer failed"));
    }

    #[traced_test]
    #[test]
    fn test_stp_off_forwards_on_enable() {
        let config = make_test_config()
            .with_bridge(
                BridgeConfig::default()
                    .with_address(MacAddress::from_index(1))
                    .with_run_stp(false),
            )
            .with_gvrp(GvrpConfig::default());
        let mut switch = Switch::new(config).unwrap();

        let actions = switch.handle(Event::PortEnabled { port: PortNumber(2) });

        assert!(actions.contains(&Action::PortForwarding {
            port: PortNumber(2),
            forwarding: true,
        }));
        assert_eq!(switch.bridge().state(PortNumber(2)), Some(PortState::Forwarding));
    }

    #[traced_test]
    #[test]
    fn test_unknown_port_is_ignored() {
        let mut switch = Switch::new(make_test_config()).unwrap();
        let actions = switch.handle(Event::PortEnabled { port: PortNumber(9) });
        assert!(actions.is_empty());
        assert!(logs_contain("Enable for unknown port ignored"));
    }

    #[traced_test]
    #[test]
    fn test_manage_vlan_without_gvrp_warns() {
        let mut switch = Switch::new(make_test_config()).unwrap();
        let actions = switch.handle(Event::ManageVlan {
            port: PortNumber(1),
            vlan: VlanId(5),
            directive: AttributeDirective::FixRegistration,
        });
        assert!(actions.is_empty());
        assert!(logs_contain("GVRP not running"));
    }

    #[test]
    fn test_set_time() {
        let mut switch = Switch::new(make_test_config()).unwrap();
        switch.set_time(Duration::from_secs(42));
        assert_eq!(switch.now(), Duration::from_secs(42));
    }
}
