//! operEdge Change Detection and Bridge Detection.
//!
//! Bridge Detection seeds `operEdge` from the administrative setting and
//! clears it for good once a BPDU arrives. Edge Change Detection turns the
//! loss of edge status into a topology change.

use super::{Machine, MachineKind, Sweep};
use crate::port::Port;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EdgeState {
    NotOperEdge,
    OperEdge,
    GenerateTc,
}

pub(crate) struct EdgeDetection;

impl Machine for EdgeDetection {
    type State = EdgeState;

    const KIND: MachineKind = MachineKind::EdgeDetection;
    const BEGIN: EdgeState = EdgeState::NotOperEdge;

    fn state(port: &Port) -> Option<EdgeState> {
        port.machines.edge
    }

    fn set_state(port: &mut Port, state: EdgeState) {
        port.machines.edge = Some(state);
    }

    fn next(sweep: &Sweep<'_>, index: usize, state: EdgeState) -> Option<EdgeState> {
        let oper_edge = sweep.ports[index].oper_edge;
        match state {
            EdgeState::NotOperEdge => oper_edge.then_some(EdgeState::OperEdge),
            EdgeState::OperEdge => (!oper_edge).then_some(EdgeState::GenerateTc),
            EdgeState::GenerateTc => Some(EdgeState::NotOperEdge),
        }
    }

    fn enter(sweep: &mut Sweep<'_>, index: usize, state: EdgeState) {
        if state == EdgeState::GenerateTc {
            sweep.ports[index].tc = true;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BridgeDetectionState {
    Init,
    BpduSeen,
}

pub(crate) struct BridgeDetection;

impl Machine for BridgeDetection {
    type State = BridgeDetectionState;

    const KIND: MachineKind = MachineKind::BridgeDetection;
    const BEGIN: BridgeDetectionState = BridgeDetectionState::Init;

    fn state(port: &Port) -> Option<BridgeDetectionState> {
        port.machines.bridge_detection
    }

    fn set_state(port: &mut Port, state: BridgeDetectionState) {
        port.machines.bridge_detection = Some(state);
    }

    fn next(
        sweep: &Sweep<'_>,
        index: usize,
        state: BridgeDetectionState,
    ) -> Option<BridgeDetectionState> {
        match state {
            BridgeDetectionState::Init if sweep.ports[index].bpdu_received => {
                Some(BridgeDetectionState::BpduSeen)
            }
            BridgeDetectionState::Init | BridgeDetectionState::BpduSeen => None,
        }
    }

    fn enter(sweep: &mut Sweep<'_>, index: usize, state: BridgeDetectionState) {
        let port = &mut sweep.ports[index];
        match state {
            BridgeDetectionState::Init => {
                port.oper_edge = port.config.admin_edge;
                port.bpdu_received = false;
            }
            BridgeDetectionState::BpduSeen => {
                if port.oper_edge {
                    info!(port = %port.number, "BPDU seen on edge port, edge status dropped");
                }
                port.oper_edge = false;
            }
        }
    }
}
