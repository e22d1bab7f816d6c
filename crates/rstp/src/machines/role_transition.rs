//! Port Role Transitions: moves a port into its selected role and runs the
//! proposal/agreement handshake that lets root and designated ports skip the
//! forward delay.

use super::{Machine, MachineKind, Sweep};
use crate::port::Port;
use rapidspan_types::PortRole;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoleTransitionState {
    InitPort,
    BlockPort,
    BackupPort,
    BlockedPort,

    RootProposed,
    RootAgreed,
    Reroot,
    RootForward,
    RootLearn,
    Rerooted,
    RootPort,

    DesignatedPropose,
    DesignatedSynced,
    DesignatedRetired,
    DesignatedForward,
    DesignatedLearn,
    DesignatedListen,
    DesignatedPort,
}

pub(crate) struct RoleTransition;

impl RoleTransition {
    fn blocked_next(sweep: &Sweep<'_>, port: &Port) -> Option<RoleTransitionState> {
        let times = &sweep.bridge.root_times;
        if port.fd_while != times.forward_delay || port.sync || port.re_root || !port.synced {
            Some(RoleTransitionState::BlockedPort)
        } else if port.rb_while != times.hello_time * 2
            && port.role == PortRole::AlternateOrBackup
        {
            Some(RoleTransitionState::BackupPort)
        } else {
            None
        }
    }

    fn root_next(sweep: &Sweep<'_>, index: usize, port: &Port) -> Option<RoleTransitionState> {
        let all_synced = sweep.all_others(index, |other| other.synced);
        if !port.forward && !port.re_root {
            return Some(RoleTransitionState::Reroot);
        }
        if (port.proposed && all_synced) || (!port.synced && all_synced) {
            return Some(RoleTransitionState::RootAgreed);
        }
        if port.proposed && !port.synced {
            return Some(RoleTransitionState::RootProposed);
        }

        let re_rooted = sweep.all_others(index, |other| other.rr_while.is_zero());
        let may_advance = port.fd_while.is_zero()
            || (re_rooted && port.rb_while.is_zero() && sweep.rstp());
        if may_advance && port.learn && !port.forward {
            return Some(RoleTransitionState::RootForward);
        }
        if may_advance && !port.learn {
            return Some(RoleTransitionState::RootLearn);
        }
        if port.re_root && port.forward {
            return Some(RoleTransitionState::Rerooted);
        }
        if port.rr_while != sweep.bridge.root_times.forward_delay {
            return Some(RoleTransitionState::RootPort);
        }
        None
    }

    fn designated_next(port: &Port) -> Option<RoleTransitionState> {
        if port.rr_while.is_zero() && port.re_root {
            return Some(RoleTransitionState::DesignatedRetired);
        }
        if (!port.learning && !port.forwarding && !port.synced)
            || (port.agreed && !port.synced)
            || (port.oper_edge && !port.synced)
            || (port.sync && port.synced)
        {
            return Some(RoleTransitionState::DesignatedSynced);
        }
        if !port.forward && !port.agreed && !port.proposing && !port.oper_edge {
            return Some(RoleTransitionState::DesignatedPropose);
        }

        let may_advance = (port.fd_while.is_zero() || port.agreed || port.oper_edge)
            && (port.rr_while.is_zero() || !port.re_root)
            && !port.sync;
        if may_advance && port.learn && !port.forward {
            return Some(RoleTransitionState::DesignatedForward);
        }
        if may_advance && !port.learn {
            return Some(RoleTransitionState::DesignatedLearn);
        }
        if ((port.sync && !port.synced) || (port.re_root && !port.rr_while.is_zero()))
            && !port.oper_edge
            && (port.learn || port.forward)
        {
            return Some(RoleTransitionState::DesignatedListen);
        }
        None
    }
}

impl Machine for RoleTransition {
    type State = RoleTransitionState;

    const KIND: MachineKind = MachineKind::RoleTransition;
    const BEGIN: RoleTransitionState = RoleTransitionState::InitPort;

    fn state(port: &Port) -> Option<RoleTransitionState> {
        port.machines.role_transition
    }

    fn set_state(port: &mut Port, state: RoleTransitionState) {
        port.machines.role_transition = Some(state);
    }

    fn next(
        sweep: &Sweep<'_>,
        index: usize,
        state: RoleTransitionState,
    ) -> Option<RoleTransitionState> {
        use RoleTransitionState::*;

        let port = &sweep.ports[index];
        let selected = port.is_selected();
        if selected && port.role != port.selected_role {
            return Some(match port.selected_role {
                PortRole::Root => RootPort,
                PortRole::Designated => DesignatedPort,
                _ => BlockPort,
            });
        }

        match state {
            InitPort => Some(BlockPort),
            BlockPort => (selected && !port.learning && !port.forwarding).then_some(BlockedPort),
            BackupPort => Some(BlockedPort),
            BlockedPort if selected => Self::blocked_next(sweep, port),
            RootProposed | RootAgreed | Reroot | RootForward | RootLearn | Rerooted => {
                Some(RootPort)
            }
            RootPort if selected => Self::root_next(sweep, index, port),
            DesignatedPropose | DesignatedSynced | DesignatedRetired | DesignatedForward
            | DesignatedLearn | DesignatedListen => Some(DesignatedPort),
            DesignatedPort if selected => Self::designated_next(port),
            BlockedPort | RootPort | DesignatedPort => None,
        }
    }

    fn enter(sweep: &mut Sweep<'_>, index: usize, state: RoleTransitionState) {
        use RoleTransitionState::*;

        let times = sweep.bridge.root_times;
        match state {
            InitPort => {
                let port = &mut sweep.ports[index];
                port.role = PortRole::Disabled;
                port.selected_role = PortRole::Disabled;
                port.reselect = true;
                port.synced = false;
                port.sync = true;
                port.re_root = true;
                port.rr_while = times.forward_delay;
                port.fd_while = times.forward_delay;
                port.rb_while = Duration::ZERO;
            }
            BlockPort => {
                let port = &mut sweep.ports[index];
                set_role(port, port.selected_role);
                port.learn = false;
                port.forward = false;
            }
            BackupPort => sweep.ports[index].rb_while = times.hello_time * 2,
            BlockedPort => {
                let port = &mut sweep.ports[index];
                port.fd_while = times.forward_delay;
                port.synced = true;
                port.rr_while = Duration::ZERO;
                port.sync = false;
                port.re_root = false;
            }

            RootProposed => {
                sweep.set_sync_all();
                sweep.ports[index].proposed = false;
            }
            RootAgreed => {
                let port = &mut sweep.ports[index];
                port.proposed = false;
                port.sync = false;
                port.synced = true;
                port.new_info = true;
            }
            Reroot => sweep.set_re_root_all(),
            RootForward => {
                let port = &mut sweep.ports[index];
                port.fd_while = Duration::ZERO;
                port.forward = true;
            }
            RootLearn => {
                let port = &mut sweep.ports[index];
                port.fd_while = times.forward_delay;
                port.learn = true;
            }
            Rerooted => sweep.ports[index].re_root = false,
            RootPort => {
                let port = &mut sweep.ports[index];
                set_role(port, PortRole::Root);
                port.rr_while = times.forward_delay;
            }

            DesignatedPropose => {
                let port = &mut sweep.ports[index];
                port.proposing = true;
                port.new_info = true;
            }
            DesignatedSynced => {
                let port = &mut sweep.ports[index];
                port.rr_while = Duration::ZERO;
                port.synced = true;
                port.sync = false;
            }
            DesignatedRetired => sweep.ports[index].re_root = false,
            DesignatedForward => {
                let port = &mut sweep.ports[index];
                port.forward = true;
                port.fd_while = Duration::ZERO;
            }
            DesignatedLearn => {
                let port = &mut sweep.ports[index];
                port.learn = true;
                port.fd_while = times.forward_delay;
            }
            DesignatedListen => {
                let port = &mut sweep.ports[index];
                port.learn = false;
                port.forward = false;
                port.fd_while = times.forward_delay;
            }
            DesignatedPort => set_role(&mut sweep.ports[index], PortRole::Designated),
        }
    }
}

fn set_role(port: &mut Port, role: PortRole) {
    if port.role != role {
        info!(port = %port.number, from = %port.role, to = %role, "Port role changed");
        port.role = role;
    }
}
