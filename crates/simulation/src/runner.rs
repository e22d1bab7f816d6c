//! The simulation runner.

use crate::event_queue::EventQueue;
use crate::network::{Endpoint, NetworkConfig, NetworkError, SimulatedNetwork};
use crate::SwitchIndex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rapidspan_core::{Action, Event, StateMachine};
use rapidspan_node::{Switch, SwitchConfig, SwitchError};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Counters collected while the simulation runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationStats {
    pub events_processed: u64,
    pub bpdus_delivered: u64,
    pub gvrp_pdus_delivered: u64,
    /// Frames sent on a port with no link.
    pub frames_dropped: u64,
    pub flushes: u64,
    pub age_outs: u64,
    pub egress_clears: u64,
    /// Ports that started or stopped forwarding.
    pub forwarding_changes: u64,
    pub timers_set: u64,
}

/// Runs a set of switches against one event queue.
pub struct SimulationRunner {
    switches: Vec<Switch>,
    queue: EventQueue,
    network: SimulatedNetwork,
    rng: ChaCha8Rng,
    now: Duration,
    forwarding: BTreeMap<Endpoint, bool>,
    stats: SimulationStats,
}

impl SimulationRunner {
    pub fn new(config: NetworkConfig, seed: u64) -> Self {
        Self {
            switches: Vec::new(),
            queue: EventQueue::default(),
            network: SimulatedNetwork::new(config),
            rng: ChaCha8Rng::seed_from_u64(seed),
            now: Duration::ZERO,
            forwarding: BTreeMap::new(),
            stats: SimulationStats::default(),
        }
    }

    /// Power on a new switch.
    pub fn add_switch(&mut self, config: SwitchConfig) -> Result<SwitchIndex, SwitchError> {
        let mut switch = Switch::new(config)?;
        let index = self.switches.len() as SwitchIndex;
        switch.set_time(self.now);
        let actions = switch.start();
        info!(switch = index, id = %switch.id(), "Switch added");
        self.switches.push(switch);
        for action in actions {
            self.process_action(index, action);
        }
        Ok(index)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Topology
    // ═══════════════════════════════════════════════════════════════════════

    /// Wire two ports together. Both come up at the current time.
    pub fn connect(&mut self, a: Endpoint, b: Endpoint) -> Result<(), NetworkError> {
        self.network.connect(a, b)?;
        let point_to_point = self.network.config().point_to_point;
        info!(a = %a, b = %b, "Link connected");
        for endpoint in [a, b] {
            self.schedule(
                endpoint.switch,
                Duration::ZERO,
                Event::LinkPointToPoint {
                    port: endpoint.port,
                    point_to_point,
                },
            );
            self.schedule(
                endpoint.switch,
                Duration::ZERO,
                Event::PortEnabled {
                    port: endpoint.port,
                },
            );
        }
        Ok(())
    }

    /// Cut the link at `endpoint`. Both ports go down at the current time.
    pub fn cut(&mut self, endpoint: Endpoint) -> Result<(), NetworkError> {
        let peer = self.network.cut(endpoint)?;
        info!(a = %endpoint, b = %peer, "Link cut");
        for end in [endpoint, peer] {
            self.schedule(end.switch, Duration::ZERO, Event::PortDisabled { port: end.port });
        }
        Ok(())
    }

    /// Deliver `event` to a switch after `delay`.
    pub fn schedule(&mut self, switch: SwitchIndex, delay: Duration, event: Event) {
        self.queue.push(self.now + delay, switch, event);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Running
    // ═══════════════════════════════════════════════════════════════════════

    /// Process the next event. Returns false when the queue is empty.
    pub fn step(&mut self) -> bool {
        let Some((key, index, event)) = self.queue.pop() else {
            return false;
        };
        self.now = key.time;
        let Some(switch) = self.switches.get_mut(index as usize) else {
            debug!(switch = index, "Event for unknown switch dropped");
            return true;
        };
        trace!(switch = index, time = ?self.now, event = event.type_name(), "Delivering event");
        switch.set_time(self.now);
        let actions = switch.handle(event);
        self.stats.events_processed += 1;
        for action in actions {
            self.process_action(index, action);
        }
        true
    }

    /// Process every event scheduled up to and including `time`.
    pub fn run_until(&mut self, time: Duration) {
        while self.queue.next_time().is_some_and(|next| next <= time) {
            self.step();
        }
        self.now = self.now.max(time);
    }

    pub fn run_for(&mut self, duration: Duration) {
        self.run_until(self.now + duration);
    }

    fn process_action(&mut self, index: SwitchIndex, action: Action) {
        match action {
            Action::SendBpdu { port, frame } => {
                if let Some(peer) = self.deliver_to(Endpoint::new(index, port)) {
                    let delay = self.network.delay(&mut self.rng);
                    self.schedule(peer.switch, delay, Event::BpduReceived { port: peer.port, frame });
                    self.stats.bpdus_delivered += 1;
                }
            }
            Action::SendGvrpPdu { port, frame } => {
                if let Some(peer) = self.deliver_to(Endpoint::new(index, port)) {
                    let delay = self.network.delay(&mut self.rng);
                    self.schedule(
                        peer.switch,
                        delay,
                        Event::GvrpPduReceived {
                            port: peer.port,
                            frame,
                        },
                    );
                    self.stats.gvrp_pdus_delivered += 1;
                }
            }
            Action::FlushDynamicEntries { port } => {
                debug!(switch = index, port = %port, "Dynamic entries flushed");
                self.stats.flushes += 1;
            }
            Action::AgeOutEntries { .. } => self.stats.age_outs += 1,
            Action::ClearEgressQueue { .. } => self.stats.egress_clears += 1,
            Action::PortForwarding { port, forwarding } => {
                let previous = self.forwarding.insert(Endpoint::new(index, port), forwarding);
                if previous.unwrap_or(false) != forwarding {
                    self.stats.forwarding_changes += 1;
                }
            }
            Action::SetTimer { id, duration } => {
                self.queue.set_timer(self.now + duration, index, id);
                self.stats.timers_set += 1;
            }
        }
    }

    fn deliver_to(&mut self, from: Endpoint) -> Option<Endpoint> {
        let peer = self.network.peer(from);
        if peer.is_none() {
            trace!(from = %from, "Frame sent on unlinked port dropped");
            self.stats.frames_dropped += 1;
        }
        peer
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn switch(&self, index: SwitchIndex) -> Option<&Switch> {
        self.switches.get(index as usize)
    }

    pub fn switches(&self) -> &[Switch] {
        &self.switches
    }

    pub fn network(&self) -> &SimulatedNetwork {
        &self.network
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Last forwarding decision the switch reported for the port.
    pub fn is_forwarding(&self, endpoint: Endpoint) -> bool {
        self.forwarding.get(&endpoint).copied().unwrap_or(false)
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }
}
