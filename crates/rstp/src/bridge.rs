//! The RSTP bridge: ports, bridge-wide variables and the sweep driver.

use crate::config::{BridgeConfig, ForceVersion, PortConfig};
use crate::fabric::BridgeFabric;
use crate::machines::{MachineKind, Sweep};
use crate::port::{MachineStates, Port, PortStats};
use crate::selection::{self, RoleSelectionState};
use crate::ConfigError;
use rapidspan_bpdu::{Bpdu, BpduType};
use rapidspan_types::{
    PortId, PortNumber, PortRole, PortState, Priority, SwitchId, Times,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Full passes over role selection and every port before the sweep is
/// considered stuck.
const MAX_PASSES: usize = 1024;

/// Bridge-wide protocol variables.
#[derive(Debug, Clone)]
pub(crate) struct BridgeVars {
    pub switch_id: SwitchId,
    pub switch_priority: Priority,
    pub switch_times: Times,
    pub root_priority: Priority,
    pub root_port_id: PortId,
    pub root_times: Times,
    pub force_version: ForceVersion,
    pub tx_hold_count: u32,
    pub migrate_time: Duration,
    pub ageing_time: Duration,
    pub role_selection: Option<RoleSelectionState>,
}

impl BridgeVars {
    pub(crate) fn new(config: &BridgeConfig) -> Self {
        let switch_id = SwitchId::new(config.priority, config.address);
        let switch_priority = Priority::new(switch_id, 0, switch_id, PortId::default());
        let switch_times = Times::new(
            Duration::ZERO,
            config.max_age,
            config.hello_time,
            config.forward_delay,
        );
        Self {
            switch_id,
            switch_priority,
            switch_times,
            root_priority: switch_priority,
            root_port_id: PortId::default(),
            root_times: switch_times,
            force_version: config.force_version,
            tx_hold_count: config.tx_hold_count,
            migrate_time: config.migrate_time,
            ageing_time: config.ageing_time,
            role_selection: None,
        }
    }
}

/// A rapid spanning tree bridge.
///
/// Every operation that changes protocol inputs runs one sweep to a global
/// fixpoint before returning. Side effects go through the [`BridgeFabric`]
/// passed in.
#[derive(Debug, Clone)]
pub struct Bridge {
    config: BridgeConfig,
    vars: BridgeVars,
    /// Sorted by port number.
    ports: Vec<Port>,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let vars = BridgeVars::new(&config);
        info!(
            switch = %vars.switch_id,
            version = ?config.force_version,
            run_stp = config.run_stp,
            "Bridge created"
        );
        Ok(Self {
            config,
            vars,
            ports: Vec::new(),
        })
    }

    fn index_of(&self, number: PortNumber) -> Result<usize, ConfigError> {
        self.ports
            .binary_search_by_key(&number, |port| port.number)
            .map_err(|_| ConfigError::UnknownPort(number))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Port management
    // ═══════════════════════════════════════════════════════════════════════

    /// Add a port. It starts disabled.
    pub fn add_port(&mut self, number: PortNumber, config: PortConfig) -> Result<(), ConfigError> {
        config.validate()?;
        match self.ports.binary_search_by_key(&number, |port| port.number) {
            Ok(_) => Err(ConfigError::DuplicatePort(number)),
            Err(position) => {
                let port = Port::new(number, config);
                debug!(port = %number, cost = port.path_cost, "Port added");
                self.ports.insert(position, port);
                Ok(())
            }
        }
    }

    /// Disable and remove a port.
    pub fn remove_port(
        &mut self,
        number: PortNumber,
        fabric: &mut dyn BridgeFabric,
    ) -> Result<(), ConfigError> {
        self.disable_port(number, fabric)?;
        let index = self.index_of(number)?;
        self.ports.remove(index);
        debug!(port = %number, "Port removed");
        Ok(())
    }

    /// Bring a port up and restart its machines from BEGIN.
    pub fn enable_port(
        &mut self,
        number: PortNumber,
        fabric: &mut dyn BridgeFabric,
    ) -> Result<(), ConfigError> {
        let index = self.index_of(number)?;
        let port = &mut self.ports[index];
        if port.enabled {
            return Ok(());
        }
        info!(port = %number, "Port enabled");
        port.mcheck = self.vars.force_version.is_rstp();
        port.enabled = true;
        port.tc_prop = true;
        port.role = PortRole::Designated;
        port.selected_role = PortRole::Designated;
        port.reselect = true;
        port.selected = false;
        port.machines = MachineStates::default();

        if self.config.run_stp {
            self.sweep(fabric);
        } else {
            self.apply_stp_off(index, fabric);
        }
        Ok(())
    }

    pub fn disable_port(
        &mut self,
        number: PortNumber,
        fabric: &mut dyn BridgeFabric,
    ) -> Result<(), ConfigError> {
        let index = self.index_of(number)?;
        let port = &mut self.ports[index];
        if !port.enabled {
            return Ok(());
        }
        info!(port = %number, "Port disabled");
        port.enabled = false;
        port.reselect = true;
        port.selected = false;

        if self.config.run_stp {
            self.sweep(fabric);
        } else {
            self.apply_stp_off(index, fabric);
        }
        Ok(())
    }

    /// Report the link's point-to-point status. Only matters for ports
    /// configured `AdminPointToPoint::Auto`.
    pub fn set_link_point_to_point(
        &mut self,
        number: PortNumber,
        point_to_point: bool,
        fabric: &mut dyn BridgeFabric,
    ) -> Result<(), ConfigError> {
        let index = self.index_of(number)?;
        let port = &mut self.ports[index];
        if port.link_point_to_point == point_to_point {
            return Ok(());
        }
        port.link_point_to_point = point_to_point;
        debug!(port = %number, point_to_point, oper = port.oper_point_to_point(), "Link duplex changed");
        if self.config.run_stp && port.enabled {
            self.sweep(fabric);
        }
        Ok(())
    }

    /// Retry RSTP on a port that fell back to legacy BPDUs.
    pub fn force_protocol_check(
        &mut self,
        number: PortNumber,
        fabric: &mut dyn BridgeFabric,
    ) -> Result<(), ConfigError> {
        let index = self.index_of(number)?;
        if !self.vars.force_version.is_rstp() || !self.config.run_stp {
            return Ok(());
        }
        let port = &mut self.ports[index];
        if !port.enabled {
            return Ok(());
        }
        debug!(port = %number, "Protocol check forced");
        port.mcheck = true;
        self.sweep(fabric);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Protocol input
    // ═══════════════════════════════════════════════════════════════════════

    /// Hand a received frame to the port.
    ///
    /// Frames that fail validation are counted and dropped without touching
    /// any machine. Frames on disabled ports are ignored.
    pub fn receive_bpdu(
        &mut self,
        number: PortNumber,
        frame: &[u8],
        fabric: &mut dyn BridgeFabric,
    ) -> Result<(), ConfigError> {
        let index = self.index_of(number)?;
        let force_version = self.vars.force_version;
        let port = &mut self.ports[index];
        if !port.enabled {
            debug!(port = %number, "BPDU on disabled port ignored");
            return Ok(());
        }

        let bpdu = match Bpdu::decode(frame) {
            Ok(bpdu) => bpdu,
            Err(e) => {
                warn!(port = %number, error = %e, "Invalid BPDU dropped");
                port.stats.invalid_received += 1;
                return Ok(());
            }
        };
        debug!(port = %number, kind = ?bpdu.kind(), "BPDU received");
        match bpdu.kind() {
            BpduType::Config => port.stats.config_received += 1,
            BpduType::Rst => port.stats.rst_received += 1,
            BpduType::Tcn => port.stats.tcn_received += 1,
        }
        if !self.config.run_stp {
            return Ok(());
        }

        port.bpdu_received = true;
        port.msg_type = Some(bpdu.kind());
        port.msg_version = bpdu.version();
        port.rcvd_bpdu = match bpdu.kind() {
            BpduType::Rst => force_version.is_rstp(),
            BpduType::Config | BpduType::Tcn => true,
        };
        if let Some(body) = bpdu.body() {
            port.msg_flags = body.flags;
            port.msg_priority = body.priority();
            port.msg_times = body.times();
        }

        self.sweep(fabric);
        Ok(())
    }

    /// One second has passed.
    pub fn tick(&mut self, fabric: &mut dyn BridgeFabric) {
        if self.config.run_stp {
            for port in self.ports.iter_mut() {
                port.tick = true;
            }
            self.sweep(fabric);
        }

        let ageing_time = self.config.ageing_time;
        for port in self.ports.iter().filter(|port| port.enabled) {
            let age = if self.config.run_stp {
                port.ageing_timer
            } else {
                ageing_time
            };
            fabric.age_out_entries(port.number, age);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Driver
    // ═══════════════════════════════════════════════════════════════════════

    /// Run role selection and every port's machines until nothing moves.
    ///
    /// # Panics
    ///
    /// Panics if the bridge does not settle within [`MAX_PASSES`] passes.
    fn sweep(&mut self, fabric: &mut dyn BridgeFabric) {
        let mut sweep = Sweep {
            ports: &mut self.ports,
            bridge: &mut self.vars,
            fabric,
        };

        for pass in 0..MAX_PASSES {
            let mut changed = selection::run(&mut sweep);
            for index in 0..sweep.ports.len() {
                let port = &sweep.ports[index];
                if !port.enabled && !port.machines.started() {
                    continue;
                }
                for _ in 0..MAX_PASSES {
                    let mut port_changed = false;
                    for kind in MachineKind::PORT_ORDER {
                        port_changed |= kind.step(&mut sweep, index);
                    }
                    if !port_changed {
                        break;
                    }
                    changed = true;
                }
            }
            if !changed {
                debug!(passes = pass + 1, "Bridge settled");
                return;
            }
        }
        panic!("Bridge did not settle after {MAX_PASSES} passes");
    }

    /// Without spanning tree, enabled ports forward and disabled ports
    /// discard.
    fn apply_stp_off(&mut self, index: usize, fabric: &mut dyn BridgeFabric) {
        let port = &mut self.ports[index];
        if port.enabled {
            port.learning = true;
            port.forwarding = true;
            port.role = PortRole::Designated;
            fabric.forwarding_enabled(port.number);
        } else {
            port.learning = false;
            port.forwarding = false;
            port.role = PortRole::Disabled;
            fabric.forwarding_disabled(port.number);
        }
        info!(port = %port.number, forwarding = port.forwarding, "Spanning tree off, port state forced");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn switch_id(&self) -> SwitchId {
        self.vars.switch_id
    }

    pub fn port(&self, number: PortNumber) -> Option<&Port> {
        let index = self.index_of(number).ok()?;
        Some(&self.ports[index])
    }

    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }

    pub fn role(&self, number: PortNumber) -> Option<PortRole> {
        self.port(number).map(Port::role)
    }

    pub fn state(&self, number: PortNumber) -> Option<PortState> {
        self.port(number).map(Port::state)
    }

    pub fn stats(&self, number: PortNumber) -> Option<&PortStats> {
        self.port(number).map(Port::stats)
    }

    pub fn root_priority(&self) -> &Priority {
        &self.vars.root_priority
    }

    /// Port id of the root port, the default id when this bridge is root.
    pub fn root_port_id(&self) -> PortId {
        self.vars.root_port_id
    }

    /// The port currently in the Root role.
    pub fn root_port(&self) -> Option<PortNumber> {
        self.ports
            .iter()
            .find(|port| port.role == PortRole::Root)
            .map(|port| port.number)
    }

    pub fn root_times(&self) -> &Times {
        &self.vars.root_times
    }

    pub fn is_root(&self) -> bool {
        self.vars.root_priority.root_id == self.vars.switch_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdminPointToPoint, PathCost};
    use crate::fabric::testing::RecordingFabric;
    use rapidspan_bpdu::{BpduFlags, ConfigBody};
    use rapidspan_types::{BpduTime, MacAddress};
    use tracing_test::traced_test;

    const P1: PortNumber = PortNumber(1);
    const P2: PortNumber = PortNumber(2);

    fn make_test_bridge(config: BridgeConfig) -> Bridge {
        let mut bridge = Bridge::new(config.with_address(MacAddress::from_index(1))).unwrap();
        bridge.add_port(P1, PortConfig::default()).unwrap();
        bridge.add_port(P2, PortConfig::default()).unwrap();
        bridge
    }

    fn make_test_body(root_priority: u16, flags: BpduFlags) -> ConfigBody {
        let root = SwitchId::new(root_priority, MacAddress::from_index(9));
        let priority = Priority::new(root, 0, root, PortId::new(128, PortNumber(1)));
        let times = Times::new(
            Duration::ZERO,
            Duration::from_secs(20),
            Duration::from_secs(2),
            Duration::from_secs(15),
        );
        ConfigBody::from_priority(flags, &priority, &times)
    }

    fn make_test_rst(flags: BpduFlags) -> Vec<u8> {
        Bpdu::Rst(make_test_body(4096, flags)).encode().to_vec()
    }

    /// Enable both ports with no neighbour and run until their start-up
    /// topology change has timed out.
    fn make_settled_bridge(config: BridgeConfig, fabric: &mut RecordingFabric) -> Bridge {
        let mut bridge = make_test_bridge(config);
        bridge.enable_port(P1, fabric).unwrap();
        bridge.enable_port(P2, fabric).unwrap();
        for _ in 0..70 {
            bridge.tick(fabric);
        }
        for number in [P1, P2] {
            assert_eq!(bridge.role(number), Some(PortRole::Designated));
            assert_eq!(bridge.state(number), Some(PortState::Forwarding));
            assert!(bridge.port(number).unwrap().tc_while.is_zero());
        }
        fabric.take_sent();
        fabric.flushed.clear();
        bridge
    }

    fn decode_all(frames: &[(PortNumber, bytes::Bytes)]) -> Vec<(PortNumber, Bpdu)> {
        frames
            .iter()
            .map(|(port, frame)| (*port, Bpdu::decode(frame).unwrap()))
            .collect()
    }

    #[traced_test]
    #[test]
    fn test_invalid_config_is_refused() {
        let config = BridgeConfig::default().with_priority(100);
        assert_eq!(
            Bridge::new(config).unwrap_err(),
            ConfigError::BridgePriority(100)
        );

        let mut bridge = make_test_bridge(BridgeConfig::default());
        assert_eq!(
            bridge.add_port(P1, PortConfig::default()),
            Err(ConfigError::DuplicatePort(P1))
        );
        assert_eq!(
            bridge.add_port(PortNumber(3), PortConfig::default().with_priority(7)),
            Err(ConfigError::PortPriority(7))
        );
        let mut fabric = RecordingFabric::default();
        assert_eq!(
            bridge.enable_port(PortNumber(9), &mut fabric),
            Err(ConfigError::UnknownPort(PortNumber(9)))
        );
    }

    #[traced_test]
    #[test]
    fn test_lone_port_walks_through_forward_delays() {
        let mut bridge = make_test_bridge(BridgeConfig::default());
        let mut fabric = RecordingFabric::default();
        bridge.enable_port(P1, &mut fabric).unwrap();

        assert!(bridge.is_root());
        assert_eq!(bridge.role(P1), Some(PortRole::Designated));
        assert_eq!(bridge.state(P1), Some(PortState::Discarding));
        assert_eq!(bridge.role(P2), Some(PortRole::Disabled));

        let sent = decode_all(&fabric.take_sent());
        let (port, Bpdu::Rst(body)) = sent[0] else {
            panic!("expected an RST BPDU, got {sent:?}");
        };
        assert_eq!(port, P1);
        assert_eq!(body.flags.role(), PortRole::Designated);
        assert!(body.flags.proposal());
        assert_eq!(body.root_id, bridge.switch_id());

        for _ in 0..14 {
            bridge.tick(&mut fabric);
        }
        assert_eq!(bridge.state(P1), Some(PortState::Discarding));
        bridge.tick(&mut fabric);
        assert_eq!(bridge.state(P1), Some(PortState::Learning));
        for _ in 0..14 {
            bridge.tick(&mut fabric);
        }
        assert_eq!(bridge.state(P1), Some(PortState::Learning));
        bridge.tick(&mut fabric);
        assert_eq!(bridge.state(P1), Some(PortState::Forwarding));
        assert_eq!(bridge.stats(P1).unwrap().forwarding_transitions, 1);
        assert_eq!(fabric.forwarding.last(), Some(&(P1, true)));

        // Periodic hellos while designated.
        assert!(bridge.stats(P1).unwrap().rst_sent >= 10);
        assert!(fabric.aged.contains(&(P1, Duration::from_secs(300))));
    }

    #[traced_test]
    #[test]
    fn test_edge_port_forwards_at_once() {
        let mut bridge = Bridge::new(BridgeConfig::default()).unwrap();
        bridge
            .add_port(P1, PortConfig::default().with_admin_edge(true))
            .unwrap();
        let mut fabric = RecordingFabric::default();
        bridge.enable_port(P1, &mut fabric).unwrap();

        assert_eq!(bridge.state(P1), Some(PortState::Forwarding));
        assert!(bridge.port(P1).unwrap().is_oper_edge());

        // A BPDU on an edge port means another bridge is attached.
        let frame = make_test_rst(BpduFlags::empty().with_role(PortRole::Designated));
        bridge.receive_bpdu(P1, &frame, &mut fabric).unwrap();
        assert!(!bridge.port(P1).unwrap().is_oper_edge());
        assert_eq!(bridge.role(P1), Some(PortRole::Root));
    }

    #[traced_test]
    #[test]
    fn test_proposal_on_point_to_point_link_is_agreed() {
        let mut bridge = Bridge::new(BridgeConfig::default()).unwrap();
        bridge
            .add_port(
                P1,
                PortConfig::default().with_admin_point_to_point(AdminPointToPoint::ForceTrue),
            )
            .unwrap();
        let mut fabric = RecordingFabric::default();
        bridge.enable_port(P1, &mut fabric).unwrap();
        fabric.take_sent();

        let flags = BpduFlags::empty()
            .with_role(PortRole::Designated)
            .with_proposal(true);
        bridge
            .receive_bpdu(P1, &make_test_rst(flags), &mut fabric)
            .unwrap();

        assert!(!bridge.is_root());
        assert_eq!(bridge.root_port(), Some(P1));
        assert_eq!(bridge.root_priority().root_path_cost, 20_000);
        assert_eq!(bridge.root_times().message_age, Duration::from_secs(1));
        assert_eq!(bridge.role(P1), Some(PortRole::Root));
        // Rapid transition: no forward delay on an agreed root port.
        assert_eq!(bridge.state(P1), Some(PortState::Forwarding));

        let sent = decode_all(&fabric.take_sent());
        assert!(sent.iter().any(|(_, bpdu)| matches!(
            bpdu,
            Bpdu::Rst(body) if body.flags.agreement() && body.flags.role() == PortRole::Root
        )));
        assert_eq!(bridge.stats(P1).unwrap().rst_received, 1);
    }

    #[traced_test]
    #[test]
    fn test_received_information_ages_out() {
        let mut bridge = Bridge::new(BridgeConfig::default()).unwrap();
        bridge.add_port(P1, PortConfig::default()).unwrap();
        let mut fabric = RecordingFabric::default();
        bridge.enable_port(P1, &mut fabric).unwrap();
        let frame = make_test_rst(BpduFlags::empty().with_role(PortRole::Designated));
        bridge.receive_bpdu(P1, &frame, &mut fabric).unwrap();
        assert!(!bridge.is_root());

        // Three hellos without a refresh.
        for _ in 0..6 {
            bridge.tick(&mut fabric);
        }
        assert!(bridge.is_root());
        assert_eq!(bridge.role(P1), Some(PortRole::Designated));
    }

    #[traced_test]
    #[test]
    fn test_invalid_bpdu_is_counted_and_dropped() {
        let mut bridge = make_test_bridge(BridgeConfig::default());
        let mut fabric = RecordingFabric::default();
        bridge.enable_port(P1, &mut fabric).unwrap();
        let before = bridge.port(P1).unwrap().port_priority;

        let mut frame = make_test_rst(BpduFlags::empty().with_role(PortRole::Designated));
        // Message age equal to max age.
        let max_age = BpduTime::from_duration(Duration::from_secs(20)).0.to_be_bytes();
        frame[27..29].copy_from_slice(&max_age);
        bridge.receive_bpdu(P1, &frame, &mut fabric).unwrap();

        let port = bridge.port(P1).unwrap();
        assert_eq!(port.stats().invalid_received, 1);
        assert_eq!(port.stats().rst_received, 0);
        assert_eq!(port.port_priority, before);
        assert!(bridge.is_root());
    }

    #[traced_test]
    #[test]
    fn test_legacy_bridge_sends_config_bpdus() {
        let mut bridge = make_test_bridge(BridgeConfig::default().with_force_version(ForceVersion::Stp));
        let mut fabric = RecordingFabric::default();
        bridge.enable_port(P1, &mut fabric).unwrap();

        let sent = decode_all(&fabric.take_sent());
        assert!(!sent.is_empty());
        assert!(sent.iter().all(|(_, bpdu)| matches!(bpdu, Bpdu::Config(_))));
        assert!(!bridge.port(P1).unwrap().sends_rstp());

        // RST BPDUs are counted but not acted on.
        let frame = make_test_rst(BpduFlags::empty().with_role(PortRole::Designated));
        bridge.receive_bpdu(P1, &frame, &mut fabric).unwrap();
        assert!(bridge.is_root());
        assert_eq!(bridge.stats(P1).unwrap().rst_received, 1);
    }

    #[traced_test]
    #[test]
    fn test_neighbour_speaking_stp_causes_fallback() {
        let mut bridge = make_test_bridge(BridgeConfig::default());
        let mut fabric = RecordingFabric::default();
        bridge.enable_port(P1, &mut fabric).unwrap();
        assert!(bridge.port(P1).unwrap().sends_rstp());

        let tcn = Bpdu::Tcn.encode();
        // Migration delay first.
        for _ in 0..3 {
            bridge.tick(&mut fabric);
        }
        bridge.receive_bpdu(P1, &tcn, &mut fabric).unwrap();
        assert!(!bridge.port(P1).unwrap().sends_rstp());
        assert_eq!(bridge.stats(P1).unwrap().tcn_received, 1);

        bridge.force_protocol_check(P1, &mut fabric).unwrap();
        assert!(bridge.port(P1).unwrap().sends_rstp());
    }

    #[traced_test]
    #[test]
    fn test_tcn_is_acknowledged_and_propagated() {
        let mut fabric = RecordingFabric::default();
        let config = BridgeConfig::default().with_force_version(ForceVersion::Stp);
        let mut bridge = make_settled_bridge(config, &mut fabric);

        bridge
            .receive_bpdu(P1, &Bpdu::Tcn.encode(), &mut fabric)
            .unwrap();
        assert_eq!(bridge.stats(P1).unwrap().tcn_received, 1);

        // Only the other port forgets what it learned.
        assert_eq!(fabric.flushed, vec![P2]);
        let tc_while = Duration::from_secs(35);
        assert_eq!(bridge.port(P2).unwrap().tc_while, tc_while);
        assert_eq!(bridge.port(P1).unwrap().tc_while, tc_while);
        assert!(bridge.port(P1).unwrap().tc_ack);

        for _ in 0..2 {
            bridge.tick(&mut fabric);
        }
        let sent = decode_all(&fabric.take_sent());
        let config_on = |number| {
            sent.iter().find_map(|(port, bpdu)| match bpdu {
                Bpdu::Config(body) if *port == number => Some(body.flags),
                _ => None,
            })
        };
        let flags = config_on(P1).expect("no Config BPDU on port 1");
        assert!(flags.tc_ack());
        assert!(flags.tc());
        let flags = config_on(P2).expect("no Config BPDU on port 2");
        assert!(flags.tc());
        assert!(!flags.tc_ack());
        // The acknowledgement goes out once.
        assert!(!bridge.port(P1).unwrap().tc_ack);
    }

    #[traced_test]
    #[test]
    fn test_tc_flag_is_propagated_to_other_ports() {
        let mut fabric = RecordingFabric::default();
        let mut bridge = make_settled_bridge(BridgeConfig::default(), &mut fabric);
        let root = *bridge.root_priority();

        // Inferior designated information: only the TC flag matters.
        let flags = BpduFlags::empty()
            .with_role(PortRole::Designated)
            .with_tc(true);
        let frame = Bpdu::Rst(make_test_body(61440, flags)).encode();
        bridge.receive_bpdu(P1, &frame, &mut fabric).unwrap();

        assert!(bridge.is_root());
        assert_eq!(*bridge.root_priority(), root);
        assert_eq!(bridge.role(P1), Some(PortRole::Designated));
        assert_eq!(fabric.flushed, vec![P2]);
        assert_eq!(bridge.port(P2).unwrap().tc_while, Duration::from_secs(35));
        assert!(bridge.port(P1).unwrap().tc_while.is_zero());

        for _ in 0..2 {
            bridge.tick(&mut fabric);
        }
        let sent = decode_all(&fabric.take_sent());
        assert!(sent.iter().any(|(port, bpdu)| matches!(
            bpdu,
            Bpdu::Rst(body) if *port == P2 && body.flags.tc()
        )));
        assert!(sent.iter().all(|(port, bpdu)| match bpdu {
            Bpdu::Rst(body) => *port != P1 || !body.flags.tc(),
            _ => true,
        }));
    }

    #[traced_test]
    #[test]
    fn test_root_port_stops_notifying_once_acknowledged() {
        let mut bridge =
            make_test_bridge(BridgeConfig::default().with_force_version(ForceVersion::Stp));
        let mut fabric = RecordingFabric::default();
        let config = Bpdu::Config(make_test_body(4096, BpduFlags::empty())).encode();
        bridge.enable_port(P1, &mut fabric).unwrap();
        bridge.enable_port(P2, &mut fabric).unwrap();
        for _ in 0..34 {
            bridge.receive_bpdu(P1, &config, &mut fabric).unwrap();
            bridge.tick(&mut fabric);
        }
        assert_eq!(bridge.role(P1), Some(PortRole::Root));
        assert_eq!(bridge.state(P1), Some(PortState::Forwarding));
        assert!(!bridge.port(P1).unwrap().tc_while.is_zero());
        let sent = decode_all(&fabric.take_sent());
        assert!(sent
            .iter()
            .any(|(port, bpdu)| *port == P1 && matches!(bpdu, Bpdu::Tcn)));

        let ack = Bpdu::Config(make_test_body(4096, BpduFlags::empty().with_tc_ack(true)))
            .encode();
        bridge.receive_bpdu(P1, &ack, &mut fabric).unwrap();
        assert!(bridge.port(P1).unwrap().tc_while.is_zero());
        assert_eq!(bridge.role(P1), Some(PortRole::Root));

        for _ in 0..4 {
            bridge.receive_bpdu(P1, &config, &mut fabric).unwrap();
            bridge.tick(&mut fabric);
        }
        let sent = decode_all(&fabric.take_sent());
        assert!(!sent
            .iter()
            .any(|(port, bpdu)| *port == P1 && matches!(bpdu, Bpdu::Tcn)));
    }

    #[traced_test]
    #[test]
    fn test_disable_blocks_and_flushes() {
        let mut bridge = Bridge::new(BridgeConfig::default()).unwrap();
        bridge
            .add_port(P1, PortConfig::default().with_admin_edge(true))
            .unwrap();
        let mut fabric = RecordingFabric::default();
        bridge.enable_port(P1, &mut fabric).unwrap();
        assert_eq!(bridge.state(P1), Some(PortState::Forwarding));

        fabric.flushed.clear();
        bridge.disable_port(P1, &mut fabric).unwrap();
        assert_eq!(bridge.state(P1), Some(PortState::Discarding));
        assert_eq!(bridge.role(P1), Some(PortRole::Disabled));
        assert_eq!(fabric.forwarding.last(), Some(&(P1, false)));
        assert!(fabric.cleared.contains(&P1));

        bridge.remove_port(P1, &mut fabric).unwrap();
        assert!(bridge.port(P1).is_none());
    }

    #[traced_test]
    #[test]
    fn test_queue_full_counts_tx_failures() {
        let mut bridge = make_test_bridge(BridgeConfig::default());
        let mut fabric = RecordingFabric {
            queue_full: true,
            ..Default::default()
        };
        bridge.enable_port(P1, &mut fabric).unwrap();
        let stats = bridge.stats(P1).unwrap();
        assert!(stats.tx_failures >= 1);
        assert_eq!(stats.rst_sent, 0);
        assert!(logs_contain("BPDU transmit failed"));
    }

    #[traced_test]
    #[test]
    fn test_stp_off_forces_forwarding() {
        let mut bridge = make_test_bridge(BridgeConfig::default().with_run_stp(false));
        let mut fabric = RecordingFabric::default();
        bridge.enable_port(P1, &mut fabric).unwrap();
        assert_eq!(bridge.state(P1), Some(PortState::Forwarding));
        assert_eq!(bridge.role(P1), Some(PortRole::Designated));
        assert!(fabric.sent.is_empty());

        let frame = make_test_rst(BpduFlags::empty().with_role(PortRole::Designated));
        bridge.receive_bpdu(P1, &frame, &mut fabric).unwrap();
        assert_eq!(bridge.stats(P1).unwrap().rst_received, 1);
        assert!(bridge.is_root());

        bridge.tick(&mut fabric);
        assert_eq!(fabric.aged, vec![(P1, Duration::from_secs(300))]);

        bridge.disable_port(P1, &mut fabric).unwrap();
        assert_eq!(fabric.forwarding, vec![(P1, true), (P1, false)]);
    }

    #[traced_test]
    #[test]
    fn test_fixed_path_cost_feeds_root_cost() {
        let mut bridge = Bridge::new(BridgeConfig::default()).unwrap();
        bridge
            .add_port(P1, PortConfig::default().with_path_cost(PathCost::Fixed(7)))
            .unwrap();
        let mut fabric = RecordingFabric::default();
        bridge.enable_port(P1, &mut fabric).unwrap();
        let frame = make_test_rst(BpduFlags::empty().with_role(PortRole::Designated));
        bridge.receive_bpdu(P1, &frame, &mut fabric).unwrap();
        assert_eq!(bridge.root_priority().root_path_cost, 7);
        assert_eq!(bridge.root_port_id(), PortId::new(128, P1));
    }
}
