//! Topology Change: detects, propagates and acknowledges topology changes.

use super::{Machine, MachineKind, Sweep};
use crate::port::Port;
use rapidspan_types::PortRole;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TopologyChangeState {
    Init,
    Inactive,
    Detected,
    NotifiedTcn,
    NotifiedTc,
    Propagating,
    Acknowledged,
    Active,
}

pub(crate) struct TopologyChange;

impl Machine for TopologyChange {
    type State = TopologyChangeState;

    const KIND: MachineKind = MachineKind::TopologyChange;
    const BEGIN: TopologyChangeState = TopologyChangeState::Init;

    fn state(port: &Port) -> Option<TopologyChangeState> {
        port.machines.topology_change
    }

    fn set_state(port: &mut Port, state: TopologyChangeState) {
        port.machines.topology_change = Some(state);
    }

    fn next(
        sweep: &Sweep<'_>,
        index: usize,
        state: TopologyChangeState,
    ) -> Option<TopologyChangeState> {
        use TopologyChangeState::*;

        let port = &sweep.ports[index];
        match state {
            Init => Some(Inactive),
            Inactive if port.role.is_active() => Some(Active),
            Inactive => (port.rcvd_tc
                || port.rcvd_tcn
                || port.rcvd_tc_ack
                || port.tc
                || port.tc_prop)
                .then_some(Inactive),
            NotifiedTcn => Some(NotifiedTc),
            Detected | NotifiedTc | Propagating | Acknowledged => Some(Active),
            Active => {
                if !port.role.is_active() {
                    Some(Init)
                } else if port.tc {
                    Some(Detected)
                } else if port.rcvd_tcn {
                    Some(NotifiedTcn)
                } else if port.rcvd_tc {
                    Some(NotifiedTc)
                } else if port.tc_prop && !port.oper_edge {
                    Some(Propagating)
                } else if port.rcvd_tc_ack {
                    Some(Acknowledged)
                } else {
                    None
                }
            }
        }
    }

    fn enter(sweep: &mut Sweep<'_>, index: usize, state: TopologyChangeState) {
        use TopologyChangeState::*;

        match state {
            Init => {
                sweep.flush(index);
                let port = &mut sweep.ports[index];
                port.tc_while = Duration::ZERO;
                port.tc = false;
                port.tc_ack = false;
                port.tc_prop = false;
            }
            Inactive => {
                let port = &mut sweep.ports[index];
                port.rcvd_tc = false;
                port.rcvd_tcn = false;
                port.rcvd_tc_ack = false;
                port.tc = false;
                port.tc_prop = false;
            }
            Detected => {
                let tc_while = sweep.new_tc_while(index);
                sweep.set_tc_prop_others(index);
                let port = &mut sweep.ports[index];
                port.tc_while = tc_while;
                port.tc = false;
                debug!(port = %port.number, tc_while = ?tc_while, "Topology change detected");
            }
            NotifiedTcn => {
                let tc_while = sweep.new_tc_while(index);
                sweep.ports[index].tc_while = tc_while;
            }
            NotifiedTc => {
                let port = &mut sweep.ports[index];
                port.rcvd_tcn = false;
                port.rcvd_tc = false;
                if port.role == PortRole::Designated {
                    port.tc_ack = true;
                }
                sweep.set_tc_prop_others(index);
            }
            Propagating => {
                let tc_while = sweep.new_tc_while(index);
                sweep.ports[index].tc_while = tc_while;
                sweep.flush(index);
                sweep.ports[index].tc_prop = false;
            }
            Acknowledged => {
                let port = &mut sweep.ports[index];
                port.tc_while = Duration::ZERO;
                port.rcvd_tc_ack = false;
            }
            Active => {}
        }
    }
}
