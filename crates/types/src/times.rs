//! Protocol timer sets and the BPDU fixed-point time encoding.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const SECOND: Duration = Duration::from_secs(1);
const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// The four timer values a bridge advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Times {
    pub message_age: Duration,
    pub max_age: Duration,
    pub hello_time: Duration,
    pub forward_delay: Duration,
}

impl Times {
    pub fn new(
        message_age: Duration,
        max_age: Duration,
        hello_time: Duration,
        forward_delay: Duration,
    ) -> Self {
        Self {
            message_age,
            max_age,
            hello_time,
            forward_delay,
        }
    }

    /// Message age increment applied per bridge hop: `max(round(max_age / 16), 1s)`.
    pub fn message_age_increment(&self) -> Duration {
        round_to_nearest_second(self.max_age / 16).max(SECOND)
    }
}

/// Time as carried on the wire: units of 1/256 second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BpduTime(pub u16);

impl BpduTime {
    /// Encode a duration, truncating toward zero and saturating at `u16::MAX`.
    pub fn from_duration(d: Duration) -> Self {
        let ticks = d.as_nanos() * 256 / NANOS_PER_SECOND;
        BpduTime(u16::try_from(ticks).unwrap_or(u16::MAX))
    }

    /// Decode to a duration. Exact, since 1/256 s is a whole number of nanoseconds.
    pub fn to_duration(self) -> Duration {
        Duration::from_nanos(u64::from(self.0) * (NANOS_PER_SECOND as u64 / 256))
    }
}

impl From<Duration> for BpduTime {
    fn from(d: Duration) -> Self {
        Self::from_duration(d)
    }
}

/// Round to the nearest whole second (halves round up).
pub fn round_to_nearest_second(d: Duration) -> Duration {
    Duration::from_secs((d + SECOND / 2).as_secs())
}

/// Count a protocol timer down by one second, stopping at zero.
pub fn decrement_by_one_second(d: Duration) -> Duration {
    d.saturating_sub(SECOND)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bpdu_time_exact_for_256ths() {
        for ticks in [0u16, 1, 255, 256, 512, 5120, 7680, u16::MAX] {
            let t = BpduTime(ticks);
            assert_eq!(BpduTime::from_duration(t.to_duration()), t);
        }
        assert_eq!(BpduTime::from_duration(Duration::from_secs(2)), BpduTime(512));
    }

    #[test]
    fn test_bpdu_time_truncates() {
        // 1ms is less than a tick.
        assert_eq!(BpduTime::from_duration(Duration::from_millis(1)), BpduTime(0));

        let original = Duration::from_millis(2_999);
        let back = BpduTime::from_duration(original).to_duration();
        assert!(back <= original);
        assert!(original - back < Duration::from_nanos(3_906_250));
    }

    #[test]
    fn test_bpdu_time_saturates() {
        assert_eq!(
            BpduTime::from_duration(Duration::from_secs(1000)),
            BpduTime(u16::MAX)
        );
    }

    #[test]
    fn test_message_age_increment() {
        let mut t = Times::new(
            Duration::ZERO,
            Duration::from_secs(20),
            Duration::from_secs(2),
            Duration::from_secs(15),
        );
        // 20/16 = 1.25s rounds to 1s.
        assert_eq!(t.message_age_increment(), SECOND);
        t.max_age = Duration::from_secs(40);
        // 2.5s rounds up to 3s.
        assert_eq!(t.message_age_increment(), Duration::from_secs(3));
        t.max_age = Duration::from_secs(6);
        // 0.375s rounds to 0, floored at 1s.
        assert_eq!(t.message_age_increment(), SECOND);
    }

    #[test]
    fn test_decrement_floors_at_zero() {
        assert_eq!(decrement_by_one_second(Duration::from_millis(300)), Duration::ZERO);
        assert_eq!(
            decrement_by_one_second(Duration::from_secs(3)),
            Duration::from_secs(2)
        );
    }
}
