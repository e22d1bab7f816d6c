//! GVRP errors.

use crate::PduError;
use rapidspan_garp::GarpError;
use rapidspan_types::VlanId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GvrpError {
    #[error(transparent)]
    Garp(#[from] GarpError),

    #[error("Malformed GVRP PDU: {0}")]
    Pdu(#[from] PduError),

    #[error("{0} cannot be registered")]
    InvalidVlan(VlanId),

    #[error("VLAN database full, {0} not registered")]
    DatabaseFull(VlanId),
}
