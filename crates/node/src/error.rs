//! Switch construction errors.

use rapidspan_gvrp::GvrpError;
use rapidspan_rstp::ConfigError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwitchError {
    #[error("Invalid bridge configuration: {0}")]
    Bridge(#[from] ConfigError),

    #[error("Invalid GVRP configuration: {0}")]
    Gvrp(#[from] GvrpError),
}
