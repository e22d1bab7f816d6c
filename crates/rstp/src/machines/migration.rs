//! Port Protocol Migration: chooses between RST and legacy BPDUs based on
//! what the neighbour sends.

use super::{Machine, MachineKind, Sweep};
use crate::port::Port;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MigrationState {
    Init,
    SendRstp,
    SendingRstp,
    SendStp,
    SendingStp,
}

pub(crate) struct Migration;

impl Machine for Migration {
    type State = MigrationState;

    const KIND: MachineKind = MachineKind::Migration;
    const BEGIN: MigrationState = MigrationState::Init;

    fn state(port: &Port) -> Option<MigrationState> {
        port.machines.migration
    }

    fn set_state(port: &mut Port, state: MigrationState) {
        port.machines.migration = Some(state);
    }

    fn next(sweep: &Sweep<'_>, index: usize, state: MigrationState) -> Option<MigrationState> {
        use MigrationState::*;

        let port = &sweep.ports[index];
        let rstp = sweep.rstp();
        if !port.enabled && !port.init_pm {
            return Some(Init);
        }
        let heard = port.rcvd_stp || port.rcvd_rstp;
        let delaying = !port.mdelay_while.is_zero();
        match state {
            Init if port.enabled => Some(if rstp { SendRstp } else { SendStp }),
            Init => None,
            SendRstp => Some(SendingRstp),
            SendingRstp => {
                if delaying && heard {
                    Some(SendingRstp)
                } else if (!delaying && port.rcvd_stp) || !rstp {
                    Some(SendStp)
                } else if port.mcheck {
                    Some(SendRstp)
                } else {
                    None
                }
            }
            SendStp => Some(SendingStp),
            SendingStp => {
                if delaying && heard {
                    Some(SendingStp)
                } else if (!delaying && port.rcvd_rstp) || port.mcheck {
                    Some(SendRstp)
                } else {
                    None
                }
            }
        }
    }

    fn enter(sweep: &mut Sweep<'_>, index: usize, state: MigrationState) {
        use MigrationState::*;

        let migrate_time = sweep.bridge.migrate_time;
        let port = &mut sweep.ports[index];
        match state {
            Init => {
                port.init_pm = true;
                port.mcheck = false;
            }
            SendRstp => {
                port.mdelay_while = migrate_time;
                port.mcheck = false;
                port.init_pm = false;
                if !port.send_rstp {
                    info!(port = %port.number, "Sending RST BPDUs");
                }
                port.send_rstp = true;
            }
            SendStp => {
                port.mdelay_while = migrate_time;
                port.init_pm = false;
                if port.send_rstp {
                    info!(port = %port.number, "Falling back to legacy STP BPDUs");
                }
                port.send_rstp = false;
            }
            SendingRstp | SendingStp => {
                port.rcvd_rstp = false;
                port.rcvd_stp = false;
            }
        }
    }
}
