//! The ten per-port state machines and the machinery that steps them.
//!
//! Each machine is a zero-sized type implementing [`Machine`]. Its current
//! state lives in the port ([`MachineStates`](crate::port::MachineStates)),
//! `None` meaning BEGIN. [`drive`] applies transitions until the machine
//! rests, running each entered state's actions exactly once per entry.

mod ageing;
mod edge;
mod information;
mod migration;
mod role_transition;
mod state_transition;
mod timers;
mod topology_change;
mod transmit;

pub(crate) use ageing::{Ageing, AgeingState};
pub(crate) use edge::{BridgeDetection, BridgeDetectionState, EdgeDetection, EdgeState};
pub(crate) use information::{Information, InfoState};
pub(crate) use migration::{Migration, MigrationState};
pub(crate) use role_transition::{RoleTransition, RoleTransitionState};
pub(crate) use state_transition::{StateTransition, StateTransitionState};
pub(crate) use timers::{Timers, TimersState};
pub(crate) use topology_change::{TopologyChange, TopologyChangeState};
pub(crate) use transmit::{Transmit, TransmitState};

use crate::bridge::BridgeVars;
use crate::config::ForceVersion;
use crate::fabric::BridgeFabric;
use crate::port::Port;
use rapidspan_bpdu::Bpdu;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Transitions one machine may take in a single step before the tables are
/// considered broken.
pub(crate) const MAX_TRANSITIONS: usize = 64;

/// Everything a machine may touch while it runs.
pub(crate) struct Sweep<'a> {
    pub ports: &'a mut [Port],
    pub bridge: &'a mut BridgeVars,
    pub fabric: &'a mut dyn BridgeFabric,
}

/// A per-port state machine.
pub(crate) trait Machine {
    type State: Copy + Eq + fmt::Debug;

    const KIND: MachineKind;

    /// State entered from BEGIN.
    const BEGIN: Self::State;

    fn state(port: &Port) -> Option<Self::State>;

    fn set_state(port: &mut Port, state: Self::State);

    /// The transition out of `state` whose condition holds, if any.
    fn next(sweep: &Sweep<'_>, index: usize, state: Self::State) -> Option<Self::State>;

    /// Entry actions of `state`.
    fn enter(sweep: &mut Sweep<'_>, index: usize, state: Self::State);
}

/// Step `M` on port `index` until no transition condition holds.
///
/// Returns whether any transition was taken.
///
/// # Panics
///
/// Panics after [`MAX_TRANSITIONS`] transitions: a machine that never rests
/// means the transition conditions are wrong, and guessing a state would
/// silently diverge from the protocol.
pub(crate) fn drive<M: Machine>(sweep: &mut Sweep<'_>, index: usize) -> bool {
    let mut changed = false;
    for _ in 0..MAX_TRANSITIONS {
        let current = M::state(&sweep.ports[index]);
        let next = match current {
            None => Some(M::BEGIN),
            Some(state) => M::next(sweep, index, state),
        };
        let Some(next) = next else {
            return changed;
        };
        debug!(
            port = %sweep.ports[index].number,
            machine = %M::KIND,
            from = ?current,
            to = ?next,
            "State transition"
        );
        M::set_state(&mut sweep.ports[index], next);
        M::enter(sweep, index, next);
        changed = true;
    }
    panic!(
        "{} machine on {} did not rest after {} transitions",
        M::KIND,
        sweep.ports[index].number,
        MAX_TRANSITIONS
    );
}

/// Identifies a per-port machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum MachineKind {
    Timers,
    Information,
    RoleTransition,
    StateTransition,
    TopologyChange,
    Migration,
    Transmit,
    Ageing,
    EdgeDetection,
    BridgeDetection,
}

impl MachineKind {
    /// Per-port evaluation order. Later machines read flags earlier ones set
    /// in the same pass.
    pub(crate) const PORT_ORDER: [MachineKind; 10] = [
        MachineKind::Timers,
        MachineKind::Information,
        MachineKind::RoleTransition,
        MachineKind::StateTransition,
        MachineKind::TopologyChange,
        MachineKind::Migration,
        MachineKind::Transmit,
        MachineKind::Ageing,
        MachineKind::EdgeDetection,
        MachineKind::BridgeDetection,
    ];

    /// Run this machine on port `index` until it rests.
    pub(crate) fn step(self, sweep: &mut Sweep<'_>, index: usize) -> bool {
        match self {
            MachineKind::Timers => drive::<Timers>(sweep, index),
            MachineKind::Information => drive::<Information>(sweep, index),
            MachineKind::RoleTransition => drive::<RoleTransition>(sweep, index),
            MachineKind::StateTransition => drive::<StateTransition>(sweep, index),
            MachineKind::TopologyChange => drive::<TopologyChange>(sweep, index),
            MachineKind::Migration => drive::<Migration>(sweep, index),
            MachineKind::Transmit => drive::<Transmit>(sweep, index),
            MachineKind::Ageing => drive::<Ageing>(sweep, index),
            MachineKind::EdgeDetection => drive::<EdgeDetection>(sweep, index),
            MachineKind::BridgeDetection => drive::<BridgeDetection>(sweep, index),
        }
    }
}

impl fmt::Display for MachineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MachineKind::Timers => "port timers",
            MachineKind::Information => "port information",
            MachineKind::RoleTransition => "role transitions",
            MachineKind::StateTransition => "state transition",
            MachineKind::TopologyChange => "topology change",
            MachineKind::Migration => "protocol migration",
            MachineKind::Transmit => "port transmit",
            MachineKind::Ageing => "ageing timer",
            MachineKind::EdgeDetection => "edge change detection",
            MachineKind::BridgeDetection => "bridge detection",
        };
        f.write_str(name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Shared procedures
// ═══════════════════════════════════════════════════════════════════════════

impl Sweep<'_> {
    pub(crate) fn rstp(&self) -> bool {
        self.bridge.force_version.is_rstp()
    }

    /// Flush dynamic entries learned on the port. Edge ports keep theirs
    /// unless the bridge is forced to legacy STP.
    pub(crate) fn flush(&mut self, index: usize) {
        let port = &self.ports[index];
        if !port.oper_edge || self.bridge.force_version == ForceVersion::Stp {
            self.fabric.flush_dynamic_entries(port.number);
        }
    }

    /// Topology change timer value for this port.
    pub(crate) fn new_tc_while(&self, index: usize) -> Duration {
        let port = &self.ports[index];
        let times = &self.bridge.root_times;
        if port.send_rstp && port.oper_point_to_point() {
            times.hello_time * 2
        } else {
            times.max_age + times.forward_delay
        }
    }

    pub(crate) fn set_sync_all(&mut self) {
        for port in self.ports.iter_mut() {
            port.sync = true;
        }
    }

    pub(crate) fn set_re_root_all(&mut self) {
        for port in self.ports.iter_mut() {
            port.re_root = true;
        }
    }

    /// Ask every port except `index` to propagate a topology change.
    pub(crate) fn set_tc_prop_others(&mut self, index: usize) {
        for (i, port) in self.ports.iter_mut().enumerate() {
            if i != index {
                port.tc_prop = true;
            }
        }
    }

    /// `pred` holds for every port except `index`.
    pub(crate) fn all_others(&self, index: usize, pred: impl Fn(&Port) -> bool) -> bool {
        self.ports
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .all(|(_, port)| pred(port))
    }

    /// Hand a BPDU to the fabric. Counters move only when the frame was
    /// queued.
    pub(crate) fn send(&mut self, index: usize, bpdu: Bpdu) {
        let number = self.ports[index].number;
        debug!(port = %number, kind = ?bpdu.kind(), "Sending BPDU");
        match self.fabric.send_bpdu(number, bpdu.encode()) {
            Ok(()) => {
                let stats = &mut self.ports[index].stats;
                match bpdu {
                    Bpdu::Config(_) => stats.config_sent += 1,
                    Bpdu::Rst(_) => stats.rst_sent += 1,
                    Bpdu::Tcn => stats.tcn_sent += 1,
                }
            }
            Err(e) => {
                warn!(port = %number, error = %e, "BPDU transmit failed");
                self.ports[index].stats.tx_failures += 1;
            }
        }
    }
}
