//! GVRP configuration.

use rapidspan_garp::GarpConfig;
use rapidspan_types::{PortNumber, VlanId};
use std::collections::BTreeMap;

/// Static VLAN configuration of one port.
#[derive(Debug, Clone)]
pub struct GvrpPortConfig {
    /// Port VLAN id. Always registered as fixed.
    pub pvid: VlanId,

    /// VLANs the port is a static member of.
    pub static_vlans: Vec<VlanId>,
}

impl Default for GvrpPortConfig {
    fn default() -> Self {
        Self {
            pvid: VlanId::DEFAULT_PVID,
            static_vlans: Vec::new(),
        }
    }
}

impl GvrpPortConfig {
    pub fn with_pvid(mut self, pvid: VlanId) -> Self {
        self.pvid = pvid;
        self
    }

    pub fn with_static_vlans(mut self, vlans: impl IntoIterator<Item = VlanId>) -> Self {
        self.static_vlans = vlans.into_iter().collect();
        self
    }
}

/// Configuration for the GVRP application on one switch.
#[derive(Debug, Clone)]
pub struct GvrpConfig {
    /// Size of the VLAN database (GID attribute slots per port).
    pub vlans_max: usize,

    /// GARP timers and jitter seed. `max_attributes` is taken from `vlans_max`.
    pub garp: GarpConfig,

    /// VLANs that never get GID machines.
    pub reserved_vlans: Vec<VlanId>,

    /// Per-port static configuration. Ports not listed use the default.
    pub ports: BTreeMap<PortNumber, GvrpPortConfig>,
}

impl Default for GvrpConfig {
    fn default() -> Self {
        Self {
            vlans_max: 10,
            garp: GarpConfig::default(),
            reserved_vlans: Vec::new(),
            ports: BTreeMap::new(),
        }
    }
}

impl GvrpConfig {
    pub fn with_vlans_max(mut self, vlans_max: usize) -> Self {
        self.vlans_max = vlans_max;
        self
    }

    pub fn with_garp(mut self, garp: GarpConfig) -> Self {
        self.garp = garp;
        self
    }

    pub fn with_reserved_vlans(mut self, vlans: impl IntoIterator<Item = VlanId>) -> Self {
        self.reserved_vlans = vlans.into_iter().collect();
        self
    }

    pub fn with_port(mut self, port: PortNumber, config: GvrpPortConfig) -> Self {
        self.ports.insert(port, config);
        self
    }

    pub fn port(&self, port: PortNumber) -> GvrpPortConfig {
        self.ports.get(&port).cloned().unwrap_or_default()
    }

    /// Whether a VLAN may be given a GID machine.
    pub fn is_registrable(&self, vlan: VlanId) -> bool {
        vlan.is_valid() && !self.reserved_vlans.contains(&vlan)
    }
}
