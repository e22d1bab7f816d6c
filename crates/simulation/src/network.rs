//! Point-to-point links between switch ports.

use crate::SwitchIndex;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rapidspan_types::PortNumber;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// One end of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Endpoint {
    pub switch: SwitchIndex,
    pub port: PortNumber,
}

impl Endpoint {
    pub fn new(switch: SwitchIndex, port: PortNumber) -> Self {
        Self { switch, port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.switch, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("{0} is already linked")]
    EndpointInUse(Endpoint),

    #[error("{0} cannot be linked to itself")]
    SelfLink(Endpoint),

    #[error("{0} is not linked")]
    NotLinked(Endpoint),
}

/// Link behaviour shared by every link in the network.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// One-way delivery delay.
    pub latency: Duration,

    /// Extra delay drawn uniformly from `0..=jitter` per frame.
    pub jitter: Duration,

    /// Whether links report themselves as point-to-point when they come up.
    pub point_to_point: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(1),
            jitter: Duration::ZERO,
            point_to_point: true,
        }
    }
}

impl NetworkConfig {
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_point_to_point(mut self, point_to_point: bool) -> Self {
        self.point_to_point = point_to_point;
        self
    }
}

/// The links currently in place. Each endpoint has at most one peer.
#[derive(Debug)]
pub struct SimulatedNetwork {
    config: NetworkConfig,
    peers: BTreeMap<Endpoint, Endpoint>,
}

impl SimulatedNetwork {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            peers: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn connect(&mut self, a: Endpoint, b: Endpoint) -> Result<(), NetworkError> {
        if a == b {
            return Err(NetworkError::SelfLink(a));
        }
        for endpoint in [a, b] {
            if self.peers.contains_key(&endpoint) {
                return Err(NetworkError::EndpointInUse(endpoint));
            }
        }
        self.peers.insert(a, b);
        self.peers.insert(b, a);
        Ok(())
    }

    /// Remove the link at `endpoint`, returning the far end.
    pub fn cut(&mut self, endpoint: Endpoint) -> Result<Endpoint, NetworkError> {
        let peer = self
            .peers
            .remove(&endpoint)
            .ok_or(NetworkError::NotLinked(endpoint))?;
        self.peers.remove(&peer);
        Ok(peer)
    }

    pub fn peer(&self, endpoint: Endpoint) -> Option<Endpoint> {
        self.peers.get(&endpoint).copied()
    }

    /// Delivery delay for one frame.
    pub fn delay(&self, rng: &mut ChaCha8Rng) -> Duration {
        if self.config.jitter.is_zero() {
            return self.config.latency;
        }
        let jitter = rng.gen_range(0..=self.config.jitter.as_micros() as u64);
        self.config.latency + Duration::from_micros(jitter)
    }

    /// Every link once, lower endpoint first.
    pub fn links(&self) -> impl Iterator<Item = (Endpoint, Endpoint)> + '_ {
        self.peers
            .iter()
            .filter(|(a, b)| a < b)
            .map(|(a, b)| (*a, *b))
    }
}
