//! GARP engine errors.

use rapidspan_types::PortNumber;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GarpError {
    #[error("{0} already exists")]
    DuplicatePort(PortNumber),

    #[error("{0} is not a GARP port")]
    UnknownPort(PortNumber),

    #[error("Invalid GARP timers: {0}")]
    InvalidTimers(String),

    #[error("Attribute index {index} out of range (capacity {capacity})")]
    IndexOutOfRange { index: usize, capacity: usize },
}
