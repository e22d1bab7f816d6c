//! VLAN registrations spreading through a switch and being withdrawn.
//!
//! Topology: a root switch S with three ports, each linked to a leaf
//! switch. Leaf N2 has an edge port statically in VLAN 100, so it declares
//! VLAN 100 toward S. S propagates the declaration to the other leaves. S
//! itself holds VLAN 200 fixed on its port 1.

use rapidspan_core::Event;
use rapidspan_gvrp::{GvrpConfig, GvrpPortConfig};
use rapidspan_node::{Switch, SwitchConfig};
use rapidspan_rstp::{BridgeConfig, PortConfig};
use rapidspan_simulation::{Endpoint, NetworkConfig, SimulationRunner, SwitchIndex};
use rapidspan_types::{AttributeDirective, MacAddress, PortNumber, VlanId};
use std::time::Duration;
use tracing_test::traced_test;

const DYNAMIC: VlanId = VlanId(100);
const FIXED: VlanId = VlanId(200);

struct Fabric {
    runner: SimulationRunner,
    root: SwitchIndex,
    leaves: [SwitchIndex; 3],
}

fn make_bridge(index: u32, priority: u16) -> BridgeConfig {
    BridgeConfig::default()
        .with_address(MacAddress::from_index(index))
        .with_priority(priority)
}

fn make_fabric(seed: u64) -> Fabric {
    let mut runner = SimulationRunner::new(NetworkConfig::default(), seed);

    let root_gvrp = GvrpConfig::default().with_port(
        PortNumber(1),
        GvrpPortConfig::default().with_static_vlans([FIXED]),
    );
    let root = runner
        .add_switch(
            SwitchConfig::default()
                .with_bridge(make_bridge(1, 4096))
                .with_default_ports(3)
                .with_gvrp(root_gvrp),
        )
        .unwrap();

    let mut leaves = [0; 3];
    for (i, leaf) in leaves.iter_mut().enumerate() {
        let n = i as u32 + 2;
        let mut gvrp = GvrpConfig::default();
        let mut config = SwitchConfig::default()
            .with_bridge(make_bridge(n, 32768))
            .with_default_ports(1);
        if n == 3 {
            gvrp = gvrp.with_port(
                PortNumber(2),
                GvrpPortConfig::default().with_static_vlans([DYNAMIC]),
            );
            config = config.with_port(PortNumber(2), PortConfig::default().with_admin_edge(true));
        }
        *leaf = runner.add_switch(config.with_gvrp(gvrp)).unwrap();
    }

    for (i, leaf) in leaves.iter().enumerate() {
        runner
            .connect(
                Endpoint::new(root, PortNumber(i as u8 + 1)),
                Endpoint::new(*leaf, PortNumber(1)),
            )
            .unwrap();
    }
    // The access port on the second leaf has no link; it is simply up.
    runner.schedule(
        leaves[1],
        Duration::ZERO,
        Event::PortEnabled {
            port: PortNumber(2),
        },
    );

    Fabric {
        runner,
        root,
        leaves,
    }
}

impl Fabric {
    fn switch(&self, index: SwitchIndex) -> &Switch {
        self.runner.switch(index).unwrap()
    }

    fn is_member(&self, index: SwitchIndex, vlan: VlanId, port: u8) -> bool {
        self.switch(index)
            .gvrp()
            .unwrap()
            .is_member(vlan, PortNumber(port))
    }
}

#[traced_test]
#[test]
fn test_join_propagates_and_leave_withdraws() {
    let mut fabric = make_fabric(11);
    let [n1, n2, n3] = fabric.leaves;
    let s = fabric.root;

    fabric.runner.run_until(Duration::from_secs(35));

    // N2 declared VLAN 100 to S port 2; S passed it on to ports 1 and 3.
    assert!(fabric.is_member(s, DYNAMIC, 2));
    assert!(fabric.is_member(n1, DYNAMIC, 1));
    assert!(fabric.is_member(n3, DYNAMIC, 1));
    // S never registered 100 on port 3: nothing was received there.
    assert!(!fabric.is_member(s, DYNAMIC, 3));
    // The fixed VLAN reaches every leaf too.
    assert!(fabric.is_member(s, FIXED, 1));
    assert!(fabric.is_member(n3, FIXED, 1));
    assert!(fabric.runner.stats().gvrp_pdus_delivered > 0);

    // N2's access port goes down and its declaration is withdrawn.
    fabric.runner.schedule(
        n2,
        Duration::ZERO,
        Event::PortDisabled {
            port: PortNumber(2),
        },
    );
    fabric.runner.run_for(Duration::from_secs(10));

    assert!(!fabric.is_member(s, DYNAMIC, 2));
    assert!(!fabric.is_member(n1, DYNAMIC, 1));
    assert!(!fabric.is_member(n3, DYNAMIC, 1));
    // Fixed registrations ignore received leaves.
    assert!(fabric.is_member(s, FIXED, 1));
    assert!(fabric.is_member(n3, FIXED, 1));
}

#[traced_test]
#[test]
fn test_forbidden_registration_is_never_made() {
    let mut fabric = make_fabric(5);
    let [_, _, n3] = fabric.leaves;
    fabric.runner.schedule(
        n3,
        Duration::ZERO,
        Event::ManageVlan {
            port: PortNumber(1),
            vlan: DYNAMIC,
            directive: AttributeDirective::ForbidRegistration,
        },
    );

    fabric.runner.run_until(Duration::from_secs(35));

    assert!(fabric.is_member(fabric.leaves[0], DYNAMIC, 1));
    assert!(!fabric.is_member(n3, DYNAMIC, 1));
}
