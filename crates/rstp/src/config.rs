//! Bridge and port configuration.

use crate::ConfigError;
use rapidspan_types::{MacAddress, MAX_PATH_COST};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BRIDGE_PRIORITY_MAX: u16 = 61440;
const BRIDGE_PRIORITY_STEP: u16 = 4096;
const PORT_PRIORITY_MAX: u8 = 240;
const PORT_PRIORITY_STEP: u8 = 16;

/// Bandwidth above which every port costs 1 (10 Tb/s).
const BANDWIDTH_MAX_BPS: u64 = 10_000_000_000_000;

/// Protocol version the bridge is forced to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ForceVersion {
    /// Legacy 802.1D: Config and TCN BPDUs only.
    Stp = 0,
    /// Rapid spanning tree.
    Rstp = 2,
}

impl ForceVersion {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Rapid transitions and RST BPDUs are allowed.
    pub fn is_rstp(self) -> bool {
        self >= ForceVersion::Rstp
    }
}

/// Spanning tree configuration for one bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Bridge MAC address, the low part of the bridge identifier.
    pub address: MacAddress,

    /// Bridge priority (0..=61440, multiple of 4096). Lower wins root election.
    pub priority: u16,

    /// Interval between periodic BPDUs.
    pub hello_time: Duration,

    /// Age at which received information is discarded.
    pub max_age: Duration,

    /// Time spent in each of Discarding and Learning on the slow path.
    pub forward_delay: Duration,

    /// Filtering database ageing time outside topology changes.
    pub ageing_time: Duration,

    /// BPDUs a port may send per second.
    pub tx_hold_count: u32,

    /// Protocol migration hold-off.
    pub migrate_time: Duration,

    pub force_version: ForceVersion,

    /// When false, ports forward as soon as they are enabled and BPDUs are
    /// only counted.
    pub run_stp: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            address: MacAddress::ZERO,
            priority: 32768,
            hello_time: Duration::from_secs(2),
            max_age: Duration::from_secs(20),
            forward_delay: Duration::from_secs(15),
            ageing_time: Duration::from_secs(300),
            tx_hold_count: 3,
            migrate_time: Duration::from_secs(3),
            force_version: ForceVersion::Rstp,
            run_stp: true,
        }
    }
}

impl BridgeConfig {
    pub fn with_address(mut self, address: MacAddress) -> Self {
        self.address = address;
        self
    }

    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_hello_time(mut self, hello_time: Duration) -> Self {
        self.hello_time = hello_time;
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_forward_delay(mut self, forward_delay: Duration) -> Self {
        self.forward_delay = forward_delay;
        self
    }

    pub fn with_ageing_time(mut self, ageing_time: Duration) -> Self {
        self.ageing_time = ageing_time;
        self
    }

    pub fn with_tx_hold_count(mut self, tx_hold_count: u32) -> Self {
        self.tx_hold_count = tx_hold_count;
        self
    }

    pub fn with_force_version(mut self, force_version: ForceVersion) -> Self {
        self.force_version = force_version;
        self
    }

    pub fn with_run_stp(mut self, run_stp: bool) -> Self {
        self.run_stp = run_stp;
        self
    }

    /// Check ranges and the timer relations fast convergence depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.priority > BRIDGE_PRIORITY_MAX || self.priority % BRIDGE_PRIORITY_STEP != 0 {
            return Err(ConfigError::BridgePriority(self.priority));
        }
        check_range("hello time", self.hello_time, 1, 10)?;
        check_range("max age", self.max_age, 6, 40)?;
        check_range("forward delay", self.forward_delay, 4, 30)?;
        check_range("ageing time", self.ageing_time, 10, 1_000_000)?;
        if !(1..=10).contains(&self.tx_hold_count) {
            return Err(ConfigError::TxHoldCount(self.tx_hold_count));
        }

        let second = Duration::from_secs(1);
        if (self.forward_delay - second) * 2 < self.max_age {
            return Err(ConfigError::ForwardDelayTooShort {
                forward_delay: self.forward_delay,
                max_age: self.max_age,
            });
        }
        if self.max_age < (self.hello_time + second) * 2 {
            return Err(ConfigError::MaxAgeTooShort {
                max_age: self.max_age,
                hello_time: self.hello_time,
            });
        }
        Ok(())
    }
}

fn check_range(
    name: &'static str,
    value: Duration,
    min_secs: u64,
    max_secs: u64,
) -> Result<(), ConfigError> {
    let min = Duration::from_secs(min_secs);
    let max = Duration::from_secs(max_secs);
    if value < min || value > max {
        return Err(ConfigError::TimerRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// How a port's path cost is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathCost {
    /// Derived from link bandwidth.
    Auto { bandwidth_bps: u64 },
    /// Set by management (1..=200_000_000).
    Fixed(u32),
}

impl Default for PathCost {
    fn default() -> Self {
        PathCost::Auto {
            bandwidth_bps: 100_000_000,
        }
    }
}

impl PathCost {
    /// The cost this setting resolves to.
    ///
    /// Auto costs divide the maximum by ten for every decade of bandwidth
    /// above 10 kb/s.
    pub fn resolve(self) -> u32 {
        match self {
            PathCost::Fixed(cost) => cost,
            PathCost::Auto { bandwidth_bps } => {
                if bandwidth_bps > BANDWIDTH_MAX_BPS {
                    return 1;
                }
                let decades = match bandwidth_bps / 10_000 {
                    0 => 0,
                    ratio => ratio.ilog10(),
                };
                (MAX_PATH_COST / 10u32.pow(decades)).max(1)
            }
        }
    }
}

/// Administrative point-to-point setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdminPointToPoint {
    /// Follow what the link reports.
    #[default]
    Auto,
    ForceTrue,
    ForceFalse,
}

impl AdminPointToPoint {
    /// Operational point-to-point status given the link's report.
    pub fn resolve(self, link_point_to_point: bool) -> bool {
        match self {
            AdminPointToPoint::Auto => link_point_to_point,
            AdminPointToPoint::ForceTrue => true,
            AdminPointToPoint::ForceFalse => false,
        }
    }
}

/// Spanning tree configuration for one port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    /// Port priority (0..=240, multiple of 16).
    pub priority: u8,
    pub path_cost: PathCost,
    pub admin_point_to_point: AdminPointToPoint,
    /// Start as an edge port until a BPDU is seen.
    pub admin_edge: bool,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            priority: 128,
            path_cost: PathCost::default(),
            admin_point_to_point: AdminPointToPoint::Auto,
            admin_edge: false,
        }
    }
}

impl PortConfig {
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_path_cost(mut self, path_cost: PathCost) -> Self {
        self.path_cost = path_cost;
        self
    }

    pub fn with_admin_point_to_point(mut self, admin: AdminPointToPoint) -> Self {
        self.admin_point_to_point = admin;
        self
    }

    pub fn with_admin_edge(mut self, admin_edge: bool) -> Self {
        self.admin_edge = admin_edge;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.priority > PORT_PRIORITY_MAX || self.priority % PORT_PRIORITY_STEP != 0 {
            return Err(ConfigError::PortPriority(self.priority));
        }
        if let PathCost::Fixed(cost) = self.path_cost {
            if cost == 0 || cost > MAX_PATH_COST {
                return Err(ConfigError::PathCost(cost));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(BridgeConfig::default().validate(), Ok(()));
        assert_eq!(PortConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_priority_must_be_a_step_multiple() {
        let config = BridgeConfig::default().with_priority(4097);
        assert_eq!(config.validate(), Err(ConfigError::BridgePriority(4097)));
        let config = BridgeConfig::default().with_priority(65535);
        assert_eq!(config.validate(), Err(ConfigError::BridgePriority(65535)));
        assert_eq!(
            PortConfig::default().with_priority(129).validate(),
            Err(ConfigError::PortPriority(129))
        );
        assert_eq!(PortConfig::default().with_priority(240).validate(), Ok(()));
    }

    #[test]
    fn test_timer_relations() {
        // 2 * (5 - 1) = 8 < 20
        let config = BridgeConfig::default().with_forward_delay(Duration::from_secs(5));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ForwardDelayTooShort { .. })
        ));

        // 6 < 2 * (4 + 1)
        let config = BridgeConfig::default()
            .with_max_age(Duration::from_secs(6))
            .with_hello_time(Duration::from_secs(4));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MaxAgeTooShort { .. })
        ));

        let config = BridgeConfig::default().with_hello_time(Duration::from_secs(11));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TimerRange { name: "hello time", .. })
        ));
    }

    #[test]
    fn test_tx_hold_count_range() {
        let config = BridgeConfig::default().with_tx_hold_count(0);
        assert_eq!(config.validate(), Err(ConfigError::TxHoldCount(0)));
    }

    #[test]
    fn test_auto_path_cost() {
        let cost = |bandwidth_bps| PathCost::Auto { bandwidth_bps }.resolve();
        assert_eq!(cost(1_000), 200_000_000);
        assert_eq!(cost(10_000), 200_000_000);
        assert_eq!(cost(10_000_000), 200_000);
        assert_eq!(cost(100_000_000), 20_000);
        assert_eq!(cost(1_000_000_000), 2_000);
        assert_eq!(cost(BANDWIDTH_MAX_BPS), 1);
        assert_eq!(cost(BANDWIDTH_MAX_BPS + 1), 1);
        assert_eq!(PathCost::Fixed(7).resolve(), 7);
    }

    #[test]
    fn test_fixed_path_cost_range() {
        let config = PortConfig::default().with_path_cost(PathCost::Fixed(0));
        assert_eq!(config.validate(), Err(ConfigError::PathCost(0)));
        let config = PortConfig::default().with_path_cost(PathCost::Fixed(MAX_PATH_COST + 1));
        assert_eq!(config.validate(), Err(ConfigError::PathCost(MAX_PATH_COST + 1)));
    }

    #[test]
    fn test_admin_point_to_point() {
        assert!(AdminPointToPoint::Auto.resolve(true));
        assert!(!AdminPointToPoint::Auto.resolve(false));
        assert!(AdminPointToPoint::ForceTrue.resolve(false));
        assert!(!AdminPointToPoint::ForceFalse.resolve(true));
    }
}
