//! Port Transmit: periodic and event-driven BPDU transmission, throttled by
//! the transmit hold count.

use super::{Machine, MachineKind, Sweep};
use crate::port::Port;
use rapidspan_bpdu::{Bpdu, BpduFlags, ConfigBody};
use rapidspan_types::PortRole;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransmitState {
    Init,
    Periodic,
    Config,
    Tcn,
    Rstp,
    Idle,
}

pub(crate) struct Transmit;

impl Machine for Transmit {
    type State = TransmitState;

    const KIND: MachineKind = MachineKind::Transmit;
    const BEGIN: TransmitState = TransmitState::Init;

    fn state(port: &Port) -> Option<TransmitState> {
        port.machines.transmit
    }

    fn set_state(port: &mut Port, state: TransmitState) {
        port.machines.transmit = Some(state);
    }

    fn next(sweep: &Sweep<'_>, index: usize, state: TransmitState) -> Option<TransmitState> {
        let port = &sweep.ports[index];
        if state != TransmitState::Idle {
            return Some(TransmitState::Idle);
        }
        if !port.is_selected() {
            return None;
        }
        if port.hello_when.is_zero() {
            return Some(TransmitState::Periodic);
        }
        if !port.new_info || port.tx_count >= sweep.bridge.tx_hold_count {
            return None;
        }
        match (port.send_rstp, port.role) {
            (false, PortRole::Designated) => Some(TransmitState::Config),
            (false, PortRole::Root) => Some(TransmitState::Tcn),
            (true, PortRole::Root | PortRole::Designated) => Some(TransmitState::Rstp),
            _ => None,
        }
    }

    fn enter(sweep: &mut Sweep<'_>, index: usize, state: TransmitState) {
        let hello_time = sweep.bridge.root_times.hello_time;
        match state {
            TransmitState::Init => {
                let port = &mut sweep.ports[index];
                port.new_info = false;
                port.hello_when = Duration::ZERO;
                port.tx_count = 0;
            }
            TransmitState::Periodic => {
                let port = &mut sweep.ports[index];
                port.new_info = port.new_info
                    || port.role == PortRole::Designated
                    || (port.role == PortRole::Root && !port.tc_while.is_zero());
                port.hello_when = hello_time;
            }
            TransmitState::Config => {
                let bpdu = Bpdu::Config(config_body(&sweep.ports[index]));
                sweep.ports[index].new_info = false;
                sweep.send(index, bpdu);
                let port = &mut sweep.ports[index];
                port.tx_count += 1;
                port.tc_ack = false;
            }
            TransmitState::Tcn => {
                sweep.ports[index].new_info = false;
                sweep.send(index, Bpdu::Tcn);
                sweep.ports[index].tx_count += 1;
            }
            TransmitState::Rstp => {
                let bpdu = Bpdu::Rst(rst_body(&sweep.ports[index]));
                sweep.ports[index].new_info = false;
                sweep.send(index, bpdu);
                let port = &mut sweep.ports[index];
                port.tx_count += 1;
                port.tc_ack = false;
            }
            TransmitState::Idle => {}
        }
    }
}

/// Legacy Config BPDU advertising the port's priority vector.
fn config_body(port: &Port) -> ConfigBody {
    let flags = BpduFlags::empty()
        .with_tc(!port.tc_while.is_zero())
        .with_tc_ack(port.tc_ack);
    ConfigBody::from_priority(flags, &port.port_priority, &port.port_times)
}

/// RST BPDU carrying the port's role, state and handshake flags.
fn rst_body(port: &Port) -> ConfigBody {
    let flags = BpduFlags::empty()
        .with_tc(!port.tc_while.is_zero())
        .with_proposal(port.proposing)
        .with_role(port.selected_role)
        .with_learning(port.learning)
        .with_forwarding(port.forwarding)
        .with_agreement(port.synced);
    ConfigBody::from_priority(flags, &port.port_priority, &port.port_times)
}
