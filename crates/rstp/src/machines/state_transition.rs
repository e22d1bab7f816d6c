//! Port State Transition: follows the `learn` and `forward` flags.

use super::{Machine, MachineKind, Sweep};
use crate::port::Port;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StateTransitionState {
    Discarding,
    Learning,
    Forwarding,
}

pub(crate) struct StateTransition;

impl Machine for StateTransition {
    type State = StateTransitionState;

    const KIND: MachineKind = MachineKind::StateTransition;
    const BEGIN: StateTransitionState = StateTransitionState::Discarding;

    fn state(port: &Port) -> Option<StateTransitionState> {
        port.machines.state_transition
    }

    fn set_state(port: &mut Port, state: StateTransitionState) {
        port.machines.state_transition = Some(state);
    }

    fn next(
        sweep: &Sweep<'_>,
        index: usize,
        state: StateTransitionState,
    ) -> Option<StateTransitionState> {
        let port = &sweep.ports[index];
        match state {
            StateTransitionState::Discarding => {
                port.learn.then_some(StateTransitionState::Learning)
            }
            StateTransitionState::Learning if port.forward => {
                Some(StateTransitionState::Forwarding)
            }
            StateTransitionState::Learning if !port.learn => {
                Some(StateTransitionState::Discarding)
            }
            StateTransitionState::Learning => None,
            StateTransitionState::Forwarding => {
                (!port.forward).then_some(StateTransitionState::Discarding)
            }
        }
    }

    fn enter(sweep: &mut Sweep<'_>, index: usize, state: StateTransitionState) {
        let number = sweep.ports[index].number;
        match state {
            StateTransitionState::Discarding => {
                sweep.flush(index);
                sweep.fabric.forwarding_disabled(number);
                sweep.fabric.clear_egress_queue(number);
                let port = &mut sweep.ports[index];
                if port.forwarding {
                    info!(port = %number, "Port left forwarding");
                }
                port.learning = false;
                port.forwarding = false;
            }
            StateTransitionState::Learning => sweep.ports[index].learning = true,
            StateTransitionState::Forwarding => {
                sweep.fabric.forwarding_enabled(number);
                let port = &mut sweep.ports[index];
                port.tc = !port.oper_edge;
                port.forwarding = true;
                port.stats.forwarding_transitions += 1;
                info!(port = %number, edge = port.oper_edge, "Port forwarding");
            }
        }
    }
}
