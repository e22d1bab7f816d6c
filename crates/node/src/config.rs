//! Switch configuration.

use rapidspan_gvrp::GvrpConfig;
use rapidspan_rstp::{BridgeConfig, PortConfig};
use rapidspan_types::PortNumber;
use std::collections::BTreeMap;

/// Everything needed to build a [`Switch`](crate::Switch).
#[derive(Debug, Clone)]
pub struct SwitchConfig {
    /// Spanning tree parameters.
    pub bridge: BridgeConfig,

    /// Ports the switch is built with. They start disabled.
    pub ports: BTreeMap<PortNumber, PortConfig>,

    /// GVRP application. `None` runs the switch without VLAN registration.
    pub gvrp: Option<GvrpConfig>,

    /// Frames a port's egress queue accepts per handled event.
    pub egress_capacity: usize,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            bridge: BridgeConfig::default(),
            ports: BTreeMap::new(),
            gvrp: None,
            egress_capacity: 16,
        }
    }
}

impl SwitchConfig {
    pub fn with_bridge(mut self, bridge: BridgeConfig) -> Self {
        self.bridge = bridge;
        self
    }

    pub fn with_port(mut self, number: PortNumber, config: PortConfig) -> Self {
        self.ports.insert(number, config);
        self
    }

    /// Add ports `1..=count` with default port configuration.
    pub fn with_default_ports(mut self, count: u8) -> Self {
        for n in 1..=count {
            self.ports.insert(PortNumber(n), PortConfig::default());
        }
        self
    }

    pub fn with_gvrp(mut self, gvrp: GvrpConfig) -> Self {
        self.gvrp = Some(gvrp);
        self
    }

    pub fn with_egress_capacity(mut self, capacity: usize) -> Self {
        self.egress_capacity = capacity;
        self
    }
}
