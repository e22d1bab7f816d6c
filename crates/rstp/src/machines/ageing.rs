//! Ageing Timer: shortens filtering database ageing to the forward delay
//! while a legacy topology change is in progress.

use super::{Machine, MachineKind, Sweep};
use crate::config::ForceVersion;
use crate::port::Port;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AgeingState {
    Long,
    Short,
}

pub(crate) struct Ageing;

impl Machine for Ageing {
    type State = AgeingState;

    const KIND: MachineKind = MachineKind::Ageing;
    const BEGIN: AgeingState = AgeingState::Short;

    fn state(port: &Port) -> Option<AgeingState> {
        port.machines.ageing
    }

    fn set_state(port: &mut Port, state: AgeingState) {
        port.machines.ageing = Some(state);
    }

    fn next(sweep: &Sweep<'_>, index: usize, state: AgeingState) -> Option<AgeingState> {
        let legacy = sweep.bridge.force_version == ForceVersion::Stp;
        let changing = !sweep.ports[index].tc_while.is_zero();
        match state {
            AgeingState::Long => (legacy && changing).then_some(AgeingState::Short),
            AgeingState::Short => (!legacy || !changing).then_some(AgeingState::Long),
        }
    }

    fn enter(sweep: &mut Sweep<'_>, index: usize, state: AgeingState) {
        sweep.ports[index].ageing_timer = match state {
            AgeingState::Long => sweep.bridge.ageing_time,
            AgeingState::Short => sweep.bridge.root_times.forward_delay,
        };
    }
}
