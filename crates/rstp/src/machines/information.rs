//! Port Information: decides what a received BPDU means for the port's
//! stored priority vector, and ages that vector out.

use super::{Machine, MachineKind, Sweep};
use crate::port::{InfoIs, Port, RcvdMsg};
use rapidspan_bpdu::BpduType;
use rapidspan_types::{PortRole, Times};
use std::cmp::Ordering;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InfoState {
    Disabled,
    Enabled,
    Aged,
    Update,
    Superior,
    Repeat,
    Agreement,
    Current,
    Receive,
}

pub(crate) struct Information;

impl Machine for Information {
    type State = InfoState;

    const KIND: MachineKind = MachineKind::Information;
    const BEGIN: InfoState = InfoState::Disabled;

    fn state(port: &Port) -> Option<InfoState> {
        port.machines.info
    }

    fn set_state(port: &mut Port, state: InfoState) {
        port.machines.info = Some(state);
    }

    fn next(sweep: &Sweep<'_>, index: usize, state: InfoState) -> Option<InfoState> {
        let port = &sweep.ports[index];
        if !port.enabled && port.info_is != InfoIs::Disabled {
            return Some(InfoState::Disabled);
        }
        match state {
            InfoState::Disabled => {
                if port.updt_info {
                    Some(InfoState::Disabled)
                } else if port.enabled && port.selected {
                    Some(InfoState::Enabled)
                } else if port.rcvd_bpdu {
                    Some(InfoState::Disabled)
                } else {
                    None
                }
            }
            InfoState::Enabled => Some(InfoState::Aged),
            InfoState::Aged => (port.selected && port.updt_info).then_some(InfoState::Update),
            InfoState::Update
            | InfoState::Superior
            | InfoState::Repeat
            | InfoState::Agreement => Some(InfoState::Current),
            InfoState::Current => {
                if port.selected && port.updt_info {
                    Some(InfoState::Update)
                } else if port.info_is == InfoIs::Received
                    && port.rcvd_info_while.is_zero()
                    && !port.updt_info
                    && !port.rcvd_bpdu
                {
                    Some(InfoState::Aged)
                } else if port.rcvd_bpdu && !port.updt_info {
                    Some(InfoState::Receive)
                } else {
                    None
                }
            }
            InfoState::Receive => Some(match port.rcvd_msg {
                RcvdMsg::Superior => InfoState::Superior,
                RcvdMsg::Repeated => InfoState::Repeat,
                RcvdMsg::ConfirmedRoot => InfoState::Agreement,
                RcvdMsg::Other => InfoState::Current,
            }),
        }
    }

    fn enter(sweep: &mut Sweep<'_>, index: usize, state: InfoState) {
        let port = &mut sweep.ports[index];
        match state {
            InfoState::Disabled => {
                port.rcvd_bpdu = false;
                port.rcvd_rstp = false;
                port.rcvd_stp = false;
                port.port_priority = port.designated_priority;
                port.port_times = port.designated_times;
                port.updt_info = false;
                port.proposing = false;
                port.agreed = false;
                port.proposed = false;
                port.rcvd_info_while = Duration::ZERO;
                port.info_is = InfoIs::Disabled;
                port.reselect = true;
                port.selected = false;
            }
            InfoState::Enabled => {
                port.port_priority = port.designated_priority;
                port.port_times = port.designated_times;
            }
            InfoState::Aged => {
                port.info_is = InfoIs::Aged;
                port.reselect = true;
                port.selected = false;
            }
            InfoState::Update => {
                port.port_priority = port.designated_priority;
                port.port_times = port.designated_times;
                port.updt_info = false;
                port.agreed = false;
                port.synced = false;
                port.proposed = false;
                port.proposing = false;
                port.info_is = InfoIs::Mine;
                port.new_info = true;
            }
            InfoState::Superior => {
                port.port_priority = port.msg_priority;
                port.port_times = port.msg_times;
                update_rcvd_info_while(port);
                port.proposing = false;
                port.proposed = record_proposed(port);
                port.info_is = InfoIs::Received;
                port.reselect = true;
                port.selected = false;
            }
            InfoState::Repeat => {
                port.proposed = record_proposed(port);
                update_rcvd_info_while(port);
            }
            InfoState::Agreement => {
                port.agreed = true;
                port.proposing = false;
            }
            InfoState::Current => {}
            InfoState::Receive => {
                port.rcvd_msg = compare_rcvd_bpdu(port);
                update_bpdu_version(port);
                set_tc_flags(port);
                port.rcvd_bpdu = false;
            }
        }
    }
}

/// Classify the last received BPDU against the port's stored information.
pub(crate) fn compare_rcvd_bpdu(port: &Port) -> RcvdMsg {
    let ordering = port.msg_priority.cmp(&port.port_priority);
    let same_times = port.msg_times == port.port_times;
    let designated = match port.msg_type {
        Some(BpduType::Rst) => port.msg_flags.role() == PortRole::Designated,
        Some(BpduType::Config) => true,
        _ => false,
    };

    if designated {
        if ordering == Ordering::Less {
            return RcvdMsg::Superior;
        }
        let same_sender = port.msg_priority.designated_switch_id
            == port.port_priority.designated_switch_id
            && port.msg_priority.designated_port_id == port.port_priority.designated_port_id;
        if same_sender && (ordering != Ordering::Equal || !same_times) {
            return RcvdMsg::Superior;
        }
        if ordering == Ordering::Equal && same_times {
            return RcvdMsg::Repeated;
        }
    }

    if port.oper_point_to_point()
        && port.msg_type == Some(BpduType::Rst)
        && port.msg_flags.role() == PortRole::Root
        && port.msg_flags.agreement()
        && ordering == Ordering::Equal
    {
        return RcvdMsg::ConfirmedRoot;
    }
    RcvdMsg::Other
}

/// A designated neighbour on a point-to-point link is proposing.
fn record_proposed(port: &Port) -> bool {
    port.oper_point_to_point()
        && port.msg_type == Some(BpduType::Rst)
        && port.msg_flags.role() == PortRole::Designated
        && port.msg_flags.proposal()
}

fn set_tc_flags(port: &mut Port) {
    match port.msg_type {
        Some(BpduType::Config) | Some(BpduType::Rst) => {
            if port.msg_flags.tc() {
                port.rcvd_tc = true;
            }
            if port.msg_flags.tc_ack() {
                port.rcvd_tc_ack = true;
            }
        }
        Some(BpduType::Tcn) => port.rcvd_tcn = true,
        None => {}
    }
}

fn update_bpdu_version(port: &mut Port) {
    match port.msg_type {
        Some(BpduType::Config) if port.msg_version < rapidspan_bpdu::VERSION_RST => {
            port.rcvd_stp = true;
        }
        Some(BpduType::Tcn) => port.rcvd_stp = true,
        Some(BpduType::Rst) => port.rcvd_rstp = true,
        _ => {}
    }
}

/// Received information lives for three hellos, or until it would exceed
/// max age one hop further on.
pub(crate) fn rcvd_info_lifetime(times: &Times) -> Duration {
    let effective_age = times.message_age + times.message_age_increment();
    if effective_age <= times.max_age {
        (times.hello_time * 3).min(times.max_age - effective_age)
    } else {
        Duration::ZERO
    }
}

fn update_rcvd_info_while(port: &mut Port) {
    port.rcvd_info_while = rcvd_info_lifetime(&port.port_times);
}
