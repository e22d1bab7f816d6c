//! Configuration for a GARP application instance.

use crate::GarpError;
use std::time::Duration;
use tracing::warn;

/// GARP timer values and attribute capacity.
///
/// Timer values are assumed to be the same across the bridged network.
#[derive(Debug, Clone)]
pub struct GarpConfig {
    /// Base join time. Each join timer is drawn from 0.5x to 1.0x of this.
    pub join_time: Duration,

    /// Leave time. Deregistration happens in four stages of a quarter each.
    pub leave_time: Duration,

    /// Base leaveall period. Each period is drawn from 1.0x to 1.5x of this.
    pub leaveall_time: Duration,

    /// Minimum gap between two PDUs on one port.
    pub hold_time: Duration,

    /// Number of attribute slots per port.
    pub max_attributes: usize,

    /// Seed for timer jitter.
    pub seed: u64,
}

impl Default for GarpConfig {
    fn default() -> Self {
        Self {
            join_time: Duration::from_millis(200),
            leave_time: Duration::from_millis(600),
            leaveall_time: Duration::from_secs(10),
            hold_time: Duration::from_millis(100),
            max_attributes: 10,
            seed: 0,
        }
    }
}

impl GarpConfig {
    pub fn with_join_time(mut self, join_time: Duration) -> Self {
        self.join_time = join_time;
        self
    }

    pub fn with_leave_time(mut self, leave_time: Duration) -> Self {
        self.leave_time = leave_time;
        self
    }

    pub fn with_leaveall_time(mut self, leaveall_time: Duration) -> Self {
        self.leaveall_time = leaveall_time;
        self
    }

    pub fn with_hold_time(mut self, hold_time: Duration) -> Self {
        self.hold_time = hold_time;
        self
    }

    pub fn with_max_attributes(mut self, max_attributes: usize) -> Self {
        self.max_attributes = max_attributes;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check the timer relationships GARP relies on.
    pub fn validate(&self) -> Result<(), GarpError> {
        if self.join_time.is_zero() {
            return Err(GarpError::InvalidTimers("join time must be non-zero".into()));
        }
        if self.leave_time < self.join_time * 3 {
            return Err(GarpError::InvalidTimers(format!(
                "leave time {:?} below three join times {:?}",
                self.leave_time,
                self.join_time * 3
            )));
        }
        if self.leaveall_time <= self.leave_time {
            return Err(GarpError::InvalidTimers(format!(
                "leaveall time {:?} not above leave time {:?}",
                self.leaveall_time, self.leave_time
            )));
        }
        if self.leaveall_time < self.leave_time * 10 {
            warn!(
                leaveall = ?self.leaveall_time,
                leave = ?self.leave_time,
                "Leaveall time is less than ten leave times"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_default_is_valid() {
        assert!(GarpConfig::default().validate().is_ok());
    }

    #[test]
    fn test_leave_time_too_short() {
        let config = GarpConfig::default().with_leave_time(Duration::from_millis(500));
        assert!(matches!(
            config.validate(),
            Err(GarpError::InvalidTimers(_))
        ));
    }

    #[test]
    fn test_leaveall_not_above_leave() {
        let config = GarpConfig::default().with_leaveall_time(Duration::from_millis(600));
        assert!(config.validate().is_err());
    }

    #[traced_test]
    #[test]
    fn test_short_leaveall_warns() {
        let config = GarpConfig::default().with_leaveall_time(Duration::from_secs(5));
        assert!(config.validate().is_ok());
        assert!(logs_contain("Leaveall time is less than ten leave times"));
    }
}
