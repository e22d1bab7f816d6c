//! Per-port spanning tree variables.
//!
//! Every flag and timer the port machines share lives in [`Port`] as a plain
//! field. The machines read and write them directly; the bridge exposes a
//! read-only view through the accessors at the bottom of this file.

use crate::config::PortConfig;
use crate::machines::{
    AgeingState, BridgeDetectionState, EdgeState, InfoState, MigrationState,
    RoleTransitionState, StateTransitionState, TimersState, TopologyChangeState, TransmitState,
};
use rapidspan_bpdu::{BpduFlags, BpduType};
use rapidspan_types::{PortId, PortNumber, PortRole, PortState, Priority, Times};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the port's current priority vector came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InfoIs {
    #[default]
    Disabled,
    Aged,
    /// Computed by this bridge.
    Mine,
    /// Taken from a received BPDU.
    Received,
}

/// How a received BPDU compares with the port's stored information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum RcvdMsg {
    Superior,
    Repeated,
    ConfirmedRoot,
    #[default]
    Other,
}

/// Current state of each per-port machine. `None` is BEGIN.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MachineStates {
    pub timers: Option<TimersState>,
    pub info: Option<InfoState>,
    pub role_transition: Option<RoleTransitionState>,
    pub state_transition: Option<StateTransitionState>,
    pub topology_change: Option<TopologyChangeState>,
    pub migration: Option<MigrationState>,
    pub transmit: Option<TransmitState>,
    pub ageing: Option<AgeingState>,
    pub edge: Option<EdgeState>,
    pub bridge_detection: Option<BridgeDetectionState>,
}

impl MachineStates {
    /// At least one machine has left BEGIN.
    pub fn started(&self) -> bool {
        self.info.is_some()
    }
}

/// Per-port counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortStats {
    pub config_sent: u64,
    pub rst_sent: u64,
    pub tcn_sent: u64,
    pub config_received: u64,
    pub rst_received: u64,
    pub tcn_received: u64,
    /// Frames dropped at the codec boundary.
    pub invalid_received: u64,
    /// Frames the egress queue refused.
    pub tx_failures: u64,
    /// Times the port entered Forwarding.
    pub forwarding_transitions: u64,
}

/// One bridge port.
#[derive(Debug, Clone)]
pub struct Port {
    pub(crate) number: PortNumber,
    pub(crate) config: PortConfig,
    pub(crate) port_id: PortId,
    pub(crate) path_cost: u32,

    pub(crate) enabled: bool,
    pub(crate) link_point_to_point: bool,
    pub(crate) oper_edge: bool,

    // Timers, counting down in whole seconds.
    pub(crate) hello_when: Duration,
    pub(crate) tc_while: Duration,
    pub(crate) fd_while: Duration,
    pub(crate) rcvd_info_while: Duration,
    pub(crate) rr_while: Duration,
    pub(crate) rb_while: Duration,
    pub(crate) mdelay_while: Duration,
    pub(crate) tx_count: u32,
    pub(crate) tick: bool,

    /// Current filtering database ageing time.
    pub(crate) ageing_timer: Duration,

    pub(crate) agreed: bool,
    pub(crate) bpdu_received: bool,
    pub(crate) forward: bool,
    pub(crate) forwarding: bool,
    pub(crate) init_pm: bool,
    pub(crate) learn: bool,
    pub(crate) learning: bool,
    pub(crate) mcheck: bool,
    pub(crate) new_info: bool,
    pub(crate) proposed: bool,
    pub(crate) proposing: bool,
    pub(crate) rcvd_bpdu: bool,
    pub(crate) rcvd_rstp: bool,
    pub(crate) rcvd_stp: bool,
    pub(crate) rcvd_tc: bool,
    pub(crate) rcvd_tc_ack: bool,
    pub(crate) rcvd_tcn: bool,
    pub(crate) re_root: bool,
    pub(crate) reselect: bool,
    pub(crate) selected: bool,
    pub(crate) send_rstp: bool,
    pub(crate) sync: bool,
    pub(crate) synced: bool,
    pub(crate) tc: bool,
    pub(crate) tc_ack: bool,
    pub(crate) tc_prop: bool,
    pub(crate) updt_info: bool,

    pub(crate) info_is: InfoIs,
    pub(crate) rcvd_msg: RcvdMsg,
    pub(crate) role: PortRole,
    pub(crate) selected_role: PortRole,

    pub(crate) port_priority: Priority,
    pub(crate) port_times: Times,
    pub(crate) designated_priority: Priority,
    pub(crate) designated_times: Times,

    // Last received BPDU.
    pub(crate) msg_type: Option<BpduType>,
    pub(crate) msg_version: u8,
    pub(crate) msg_flags: BpduFlags,
    pub(crate) msg_priority: Priority,
    pub(crate) msg_times: Times,

    pub(crate) machines: MachineStates,
    pub(crate) stats: PortStats,
}

impl Port {
    pub(crate) fn new(number: PortNumber, config: PortConfig) -> Self {
        Self {
            number,
            port_id: PortId::new(config.priority, number),
            path_cost: config.path_cost.resolve(),
            config,
            enabled: false,
            link_point_to_point: false,
            oper_edge: false,
            hello_when: Duration::ZERO,
            tc_while: Duration::ZERO,
            fd_while: Duration::ZERO,
            rcvd_info_while: Duration::ZERO,
            rr_while: Duration::ZERO,
            rb_while: Duration::ZERO,
            mdelay_while: Duration::ZERO,
            tx_count: 0,
            tick: false,
            ageing_timer: Duration::ZERO,
            agreed: false,
            bpdu_received: false,
            forward: false,
            forwarding: false,
            init_pm: false,
            learn: false,
            learning: false,
            mcheck: false,
            new_info: false,
            proposed: false,
            proposing: false,
            rcvd_bpdu: false,
            rcvd_rstp: false,
            rcvd_stp: false,
            rcvd_tc: false,
            rcvd_tc_ack: false,
            rcvd_tcn: false,
            re_root: false,
            reselect: false,
            selected: false,
            send_rstp: false,
            sync: false,
            synced: false,
            tc: false,
            tc_ack: false,
            tc_prop: false,
            updt_info: false,
            info_is: InfoIs::Disabled,
            rcvd_msg: RcvdMsg::Other,
            role: PortRole::Disabled,
            selected_role: PortRole::Disabled,
            port_priority: Priority::default(),
            port_times: Times::default(),
            designated_priority: Priority::default(),
            designated_times: Times::default(),
            msg_type: None,
            msg_version: 0,
            msg_flags: BpduFlags::empty(),
            msg_priority: Priority::default(),
            msg_times: Times::default(),
            machines: MachineStates::default(),
            stats: PortStats::default(),
        }
    }

    /// Operational point-to-point status.
    pub(crate) fn oper_point_to_point(&self) -> bool {
        self.config.admin_point_to_point.resolve(self.link_point_to_point)
    }

    /// This port is selected and its information is current.
    pub(crate) fn is_selected(&self) -> bool {
        self.selected && !self.updt_info
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Read-only view
    // ═══════════════════════════════════════════════════════════════════════

    pub fn number(&self) -> PortNumber {
        self.number
    }

    pub fn port_id(&self) -> PortId {
        self.port_id
    }

    pub fn config(&self) -> &PortConfig {
        &self.config
    }

    pub fn path_cost(&self) -> u32 {
        self.path_cost
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn role(&self) -> PortRole {
        self.role
    }

    pub fn state(&self) -> PortState {
        if self.forwarding {
            PortState::Forwarding
        } else if self.learning {
            PortState::Learning
        } else {
            PortState::Discarding
        }
    }

    pub fn info_is(&self) -> InfoIs {
        self.info_is
    }

    pub fn is_oper_edge(&self) -> bool {
        self.oper_edge
    }

    pub fn is_point_to_point(&self) -> bool {
        self.oper_point_to_point()
    }

    /// Speaking RST BPDUs rather than legacy Config/TCN.
    pub fn sends_rstp(&self) -> bool {
        self.send_rstp
    }

    pub fn port_priority(&self) -> &Priority {
        &self.port_priority
    }

    pub fn designated_priority(&self) -> &Priority {
        &self.designated_priority
    }

    pub fn port_times(&self) -> &Times {
        &self.port_times
    }

    pub fn stats(&self) -> &PortStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdminPointToPoint, PathCost};

    #[test]
    fn test_new_port_is_disabled_and_discarding() {
        let port = Port::new(
            PortNumber(3),
            PortConfig::default().with_path_cost(PathCost::Fixed(4)),
        );
        assert_eq!(port.port_id(), PortId::new(128, PortNumber(3)));
        assert_eq!(port.path_cost(), 4);
        assert_eq!(port.role(), PortRole::Disabled);
        assert_eq!(port.state(), PortState::Discarding);
        assert!(!port.machines.started());
    }

    #[test]
    fn test_point_to_point_follows_admin_setting() {
        let mut port = Port::new(PortNumber(1), PortConfig::default());
        assert!(!port.is_point_to_point());
        port.link_point_to_point = true;
        assert!(port.is_point_to_point());

        port.config = PortConfig::default().with_admin_point_to_point(AdminPointToPoint::ForceFalse);
        assert!(!port.is_point_to_point());
    }
}
