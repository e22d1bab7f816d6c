//! Port Role Selection.
//!
//! The one bridge-scoped machine. It computes the root priority vector from
//! the information every port holds, derives each port's designated
//! priority and selected role, and releases all ports together once no port
//! asks for reselection.

use crate::bridge::BridgeVars;
use crate::machines::{Sweep, MAX_TRANSITIONS};
use crate::port::{InfoIs, Port};
use rapidspan_types::{PortId, PortRole, PriorityVector};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoleSelectionState {
    InitBridge,
    RoleSelection,
}

/// Step role selection until it rests. Returns whether it moved.
pub(crate) fn run(sweep: &mut Sweep<'_>) -> bool {
    let mut changed = false;
    for _ in 0..MAX_TRANSITIONS {
        let current = sweep.bridge.role_selection;
        let next = match current {
            None => Some(RoleSelectionState::InitBridge),
            Some(RoleSelectionState::InitBridge) => Some(RoleSelectionState::RoleSelection),
            Some(RoleSelectionState::RoleSelection) => sweep
                .ports
                .iter()
                .any(|port| port.reselect)
                .then_some(RoleSelectionState::RoleSelection),
        };
        let Some(next) = next else {
            return changed;
        };
        debug!(from = ?current, to = ?next, "Role selection transition");
        sweep.bridge.role_selection = Some(next);
        match next {
            RoleSelectionState::InitBridge => {
                for port in sweep.ports.iter_mut() {
                    port.selected_role = PortRole::Disabled;
                }
            }
            RoleSelectionState::RoleSelection => {
                for port in sweep.ports.iter_mut() {
                    port.reselect = false;
                }
                update_roles(sweep.ports, sweep.bridge);
                set_selected(sweep.ports);
            }
        }
        changed = true;
    }
    panic!("Role selection did not rest after {MAX_TRANSITIONS} transitions");
}

/// Compute the root vector, then every port's designated information and
/// selected role.
pub(crate) fn update_roles(ports: &mut [Port], bridge: &mut BridgeVars) {
    let own_id = bridge.switch_id;
    let mut root = PriorityVector::new(bridge.switch_priority, PortId::default());
    let mut root_times = bridge.switch_times;

    for port in ports.iter() {
        if !port.enabled || port.info_is != InfoIs::Received {
            continue;
        }
        let candidate = PriorityVector::new(
            port.port_priority.with_added_cost(port.path_cost),
            port.port_id,
        );
        // Our own information reflected back is never a root path.
        if candidate.priority.designated_switch_id != own_id && candidate < root {
            root = candidate;
            root_times = port.port_times;
        }
    }

    if root.priority != bridge.switch_priority {
        root_times.message_age += root_times.message_age_increment();
    }
    if root.priority.root_id != bridge.root_priority.root_id {
        info!(
            root = %root.priority.root_id,
            cost = root.priority.root_path_cost,
            port = %root.rx_port_id,
            "Root bridge changed"
        );
    }
    bridge.root_priority = root.priority;
    bridge.root_port_id = root.rx_port_id;
    bridge.root_times = root_times;

    let through_root = root.priority.root_id < own_id;
    for port in ports.iter_mut() {
        if port.role != PortRole::Disabled {
            let (mut designated, times) = if through_root {
                (root.priority, root_times)
            } else {
                (bridge.switch_priority, bridge.switch_times)
            };
            designated.designated_switch_id = own_id;
            designated.designated_port_id = port.port_id;
            port.designated_priority = designated;
            port.designated_times = times;
        }

        let selected_role = match port.info_is {
            InfoIs::Disabled => PortRole::Disabled,
            InfoIs::Aged => {
                port.updt_info = true;
                PortRole::Designated
            }
            InfoIs::Mine => {
                if port.port_priority != port.designated_priority
                    || port.port_times != port.designated_times
                {
                    port.updt_info = true;
                }
                PortRole::Designated
            }
            InfoIs::Received => {
                if port.port_id == root.rx_port_id {
                    port.updt_info = false;
                    PortRole::Root
                } else if port.designated_priority >= port.port_priority {
                    port.updt_info = false;
                    PortRole::AlternateOrBackup
                } else {
                    port.updt_info = true;
                    PortRole::Designated
                }
            }
        };
        if selected_role != port.selected_role {
            debug!(port = %port.number, role = %selected_role, "Role selected");
            port.selected_role = selected_role;
        }
    }
}

/// Release every port at once, and only when no port wants reselection.
fn set_selected(ports: &mut [Port]) {
    if ports.iter().any(|port| port.reselect) {
        return;
    }
    for port in ports.iter_mut() {
        port.selected = true;
    }
}
