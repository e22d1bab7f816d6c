//! Bridge configuration and transmit errors.

use rapidspan_types::PortNumber;
use std::time::Duration;
use thiserror::Error;

/// A bridge or port configuration the protocol cannot run with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Bridge priority {0} not in 0..=61440 or not a multiple of 4096")]
    BridgePriority(u16),

    #[error("Port priority {0} not in 0..=240 or not a multiple of 16")]
    PortPriority(u8),

    #[error("Path cost {0} not in 1..=200000000")]
    PathCost(u32),

    #[error("{name} {value:?} outside {min:?}..={max:?}")]
    TimerRange {
        name: &'static str,
        value: Duration,
        min: Duration,
        max: Duration,
    },

    #[error("Transmit hold count {0} not in 1..=10")]
    TxHoldCount(u32),

    #[error("2 * (forward delay {forward_delay:?} - 1s) is below max age {max_age:?}")]
    ForwardDelayTooShort {
        forward_delay: Duration,
        max_age: Duration,
    },

    #[error("Max age {max_age:?} is below 2 * (hello time {hello_time:?} + 1s)")]
    MaxAgeTooShort {
        max_age: Duration,
        hello_time: Duration,
    },

    #[error("{0} already exists")]
    DuplicatePort(PortNumber),

    #[error("{0} does not exist")]
    UnknownPort(PortNumber),
}

/// The egress queue refused a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransmitError {
    #[error("Egress queue full on {0}")]
    QueueFull(PortNumber),
}
