//! Port Timers: decrements every per-port timer once per tick.

use super::{Machine, MachineKind, Sweep};
use crate::port::Port;
use rapidspan_types::decrement_by_one_second;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimersState {
    OneSecond,
    Tick,
}

pub(crate) struct Timers;

impl Machine for Timers {
    type State = TimersState;

    const KIND: MachineKind = MachineKind::Timers;
    const BEGIN: TimersState = TimersState::OneSecond;

    fn state(port: &Port) -> Option<TimersState> {
        port.machines.timers
    }

    fn set_state(port: &mut Port, state: TimersState) {
        port.machines.timers = Some(state);
    }

    fn next(sweep: &Sweep<'_>, index: usize, state: TimersState) -> Option<TimersState> {
        match state {
            TimersState::OneSecond if sweep.ports[index].tick => Some(TimersState::Tick),
            TimersState::OneSecond => None,
            TimersState::Tick => Some(TimersState::OneSecond),
        }
    }

    fn enter(sweep: &mut Sweep<'_>, index: usize, state: TimersState) {
        let port = &mut sweep.ports[index];
        match state {
            TimersState::OneSecond => port.tick = false,
            TimersState::Tick => {
                for timer in [
                    &mut port.hello_when,
                    &mut port.tc_while,
                    &mut port.fd_while,
                    &mut port.rcvd_info_while,
                    &mut port.rr_while,
                    &mut port.rb_while,
                    &mut port.mdelay_while,
                ] {
                    *timer = decrement_by_one_second(*timer);
                }
                port.tx_count = port.tx_count.saturating_sub(1);
            }
        }
    }
}
