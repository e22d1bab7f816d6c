//! The GARP engine: GID ports, GIP propagation and timer choreography.

use crate::gid::{AttributeState, GidEvent, Indication};
use crate::port::{GidPort, TxCursor, LEAVEALL_COUNT};
use crate::{GarpApplication, GarpConfig, GarpError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rapidspan_types::{AttributeDirective, GarpTimer, PortNumber};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A timer the engine wants (re)started. Starting a timer replaces any
/// pending instance with the same port and kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRequest {
    pub port: PortNumber,
    pub timer: GarpTimer,
    pub duration: Duration,
}

/// GIP propagation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GipStats {
    /// Joins that passed the propagation gate.
    pub join_propagations: u64,
    /// Leaves that passed the propagation gate.
    pub leave_propagations: u64,
}

/// One GARP application instance on one bridge.
///
/// Ports are kept sorted by number. The connected ring is the subset of
/// ports with `connected` set, visited in port order starting after the
/// port of interest.
pub struct Garp {
    config: GarpConfig,
    ports: Vec<GidPort>,
    /// Per-attribute count of connected ports that registered it.
    gip: Vec<u32>,
    /// One past the highest attribute slot ever used.
    last_gid_index: usize,
    rng: ChaCha8Rng,
    timers: Vec<TimerRequest>,
    stats: GipStats,
}

impl Garp {
    pub fn new(config: GarpConfig) -> Result<Self, GarpError> {
        config.validate()?;
        Ok(Self {
            gip: vec![0; config.max_attributes],
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            ports: Vec::new(),
            last_gid_index: 0,
            timers: Vec::new(),
            stats: GipStats::default(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn config(&self) -> &GarpConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.config.max_attributes
    }

    pub fn last_gid_index(&self) -> usize {
        self.last_gid_index
    }

    /// Mark an attribute slot as in use, extending the scanned range.
    pub fn claim_index(&mut self, index: usize) {
        if index < self.capacity() {
            self.last_gid_index = self.last_gid_index.max(index + 1);
        }
    }

    pub fn ports(&self) -> impl Iterator<Item = &GidPort> {
        self.ports.iter()
    }

    pub fn port(&self, port: PortNumber) -> Option<&GidPort> {
        self.position(port).ok().map(|pi| &self.ports[pi])
    }

    pub fn attribute_state(&self, port: PortNumber, index: usize) -> Option<AttributeState> {
        self.port(port)?.machine(index).map(|m| m.states())
    }

    pub fn gip_count(&self, index: usize) -> u32 {
        self.gip.get(index).copied().unwrap_or(0)
    }

    pub fn stats(&self) -> GipStats {
        self.stats
    }

    /// Drain the timers started since the last call.
    pub fn take_timer_requests(&mut self) -> Vec<TimerRequest> {
        std::mem::take(&mut self.timers)
    }

    fn position(&self, port: PortNumber) -> Result<usize, usize> {
        self.ports.binary_search_by_key(&port, |p| p.number)
    }

    fn find(&self, port: PortNumber) -> Result<usize, GarpError> {
        self.position(port)
            .map_err(|_| GarpError::UnknownPort(port))
    }

    fn check_index(&self, index: usize) -> Result<(), GarpError> {
        if index < self.capacity() {
            Ok(())
        } else {
            Err(GarpError::IndexOutOfRange {
                index,
                capacity: self.capacity(),
            })
        }
    }

    /// Port indices in ring order, starting at `pi`.
    fn ring_from(&self, pi: usize) -> impl Iterator<Item = usize> {
        let n = self.ports.len();
        (0..n).map(move |k| (pi + k) % n)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Port lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Create the GID instance for a port and start its leaveall timer.
    pub fn create_port(&mut self, port: PortNumber) -> Result<(), GarpError> {
        let pos = match self.position(port) {
            Ok(_) => return Err(GarpError::DuplicatePort(port)),
            Err(pos) => pos,
        };
        self.ports.insert(
            pos,
            GidPort::new(port, self.capacity(), self.last_gid_index),
        );
        let delay = self.leaveall_period();
        self.start_timer(port, GarpTimer::LeaveAll, delay);
        debug!(port = %port, "GID port created");
        Ok(())
    }

    /// Disconnect and remove a port, withdrawing its registrations.
    pub fn destroy_port(
        &mut self,
        port: PortNumber,
        app: &mut dyn GarpApplication,
    ) -> Result<(), GarpError> {
        self.disconnect_port(port, app)?;
        let pi = self.find(port)?;
        let removed = self.ports.remove(pi);
        for index in 0..self.last_gid_index {
            if removed.registered_here(index) {
                app.leave_indication(port, index);
            }
        }
        debug!(port = %port, "GID port destroyed");
        Ok(())
    }

    /// Join the port to the connected ring and exchange registrations with it.
    pub fn connect_port(
        &mut self,
        port: PortNumber,
        app: &mut dyn GarpApplication,
    ) -> Result<(), GarpError> {
        let pi = self.find(port)?;
        if self.ports[pi].connected {
            return Ok(());
        }
        {
            let p = &mut self.ports[pi];
            p.connected = true;
            p.last_transmitted = 0;
            p.last_to_transmit = self.last_gid_index;
        }
        info!(port = %port, "GIP port connected");

        for index in 0..self.last_gid_index {
            if self.propagates_to(pi, index) {
                self.ports[pi].apply(index, GidEvent::Join);
            }
            if self.ports[pi].registered_here(index) {
                self.propagate_join(pi, index, app);
            }
        }
        self.gip_do_actions(pi, app);
        Ok(())
    }

    /// Withdraw the port's registrations from the ring, then leave it.
    pub fn disconnect_port(
        &mut self,
        port: PortNumber,
        app: &mut dyn GarpApplication,
    ) -> Result<(), GarpError> {
        let pi = self.find(port)?;
        if !self.ports[pi].connected {
            return Ok(());
        }

        for index in 0..self.last_gid_index {
            if self.propagates_to(pi, index) {
                self.ports[pi].apply(index, GidEvent::Leave);
            }
            if self.ports[pi].registered_here(index) {
                self.propagate_leave(pi, index, app);
            }
        }
        self.gip_do_actions(pi, app);
        self.ports[pi].connected = false;
        info!(port = %port, "GIP port disconnected");
        Ok(())
    }

    /// Whether any other connected port has the attribute registered.
    fn propagates_to(&self, pi: usize, index: usize) -> bool {
        self.ports
            .iter()
            .enumerate()
            .any(|(i, p)| i != pi && p.connected && p.registered_here(index))
    }

    /// First attribute slot at or after `from` that is inactive on every port.
    pub fn find_unused(&self, from: usize) -> Option<usize> {
        (from..self.last_gid_index).find(|&index| {
            self.ports
                .iter()
                .all(|p| p.machines.get(index).is_some_and(|m| !m.is_active()))
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Events
    // ═══════════════════════════════════════════════════════════════════════

    /// Apply a received message to one attribute.
    pub fn receive_msg(
        &mut self,
        port: PortNumber,
        index: usize,
        event: GidEvent,
        app: &mut dyn GarpApplication,
    ) -> Result<(), GarpError> {
        self.check_index(index)?;
        let pi = self.find(port)?;
        let indication = self.ports[pi].apply(index, event);
        self.indicate(pi, index, indication, app);
        Ok(())
    }

    /// A LeaveAll arrived: every attribute must be re-declared.
    pub fn receive_leave_all(&mut self, port: PortNumber) -> Result<(), GarpError> {
        let pi = self.find(port)?;
        let last = self.last_gid_index;
        let p = &mut self.ports[pi];
        p.leaveall_countdown = LEAVEALL_COUNT;
        p.leave_all(last);
        debug!(port = %port, "LeaveAll received");
        Ok(())
    }

    /// Apply a management directive to one attribute.
    pub fn manage_attribute(
        &mut self,
        port: PortNumber,
        index: usize,
        directive: AttributeDirective,
        app: &mut dyn GarpApplication,
    ) -> Result<(), GarpError> {
        let event = match directive {
            AttributeDirective::NormalOperation => GidEvent::NormalOperation,
            AttributeDirective::NoProtocol => GidEvent::NoProtocol,
            AttributeDirective::NormalRegistration => GidEvent::NormalRegistration,
            AttributeDirective::FixRegistration => GidEvent::FixRegistration,
            AttributeDirective::ForbidRegistration => GidEvent::ForbidRegistration,
        };
        debug!(port = %port, index = index, directive = ?directive, "Managing attribute");
        self.receive_msg(port, index, event, app)
    }

    /// Local request to declare an attribute. No indication is raised.
    pub fn join_request(&mut self, port: PortNumber, index: usize) -> Result<(), GarpError> {
        self.check_index(index)?;
        let pi = self.find(port)?;
        self.ports[pi].apply(index, GidEvent::Join);
        Ok(())
    }

    /// Local request to withdraw an attribute. No indication is raised.
    pub fn leave_request(&mut self, port: PortNumber, index: usize) -> Result<(), GarpError> {
        self.check_index(index)?;
        let pi = self.find(port)?;
        self.ports[pi].apply(index, GidEvent::Leave);
        Ok(())
    }

    /// Carry out the timer and transmit work accumulated on the port's ring.
    pub fn do_actions(
        &mut self,
        port: PortNumber,
        app: &mut dyn GarpApplication,
    ) -> Result<(), GarpError> {
        let pi = self.find(port)?;
        self.gip_do_actions(pi, app);
        Ok(())
    }

    fn indicate(
        &mut self,
        pi: usize,
        index: usize,
        indication: Indication,
        app: &mut dyn GarpApplication,
    ) {
        let port = self.ports[pi].number;
        match indication {
            Indication::None => {}
            Indication::Join => {
                debug!(port = %port, index = index, "Join indication");
                app.join_indication(port, index);
                self.propagate_join(pi, index, app);
            }
            Indication::Leave => {
                debug!(port = %port, index = index, "Leave indication");
                app.leave_indication(port, index);
                self.propagate_leave(pi, index, app);
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // GIP propagation
    // ═══════════════════════════════════════════════════════════════════════

    fn propagate_join(&mut self, pi: usize, index: usize, app: &mut dyn GarpApplication) {
        if !self.ports[pi].connected {
            return;
        }
        self.gip[index] += 1;
        let joined = self.gip[index];
        if joined > 2 {
            return;
        }
        self.stats.join_propagations += 1;

        let source = self.ports[pi].number;
        let targets: Vec<usize> = self.ring_from(pi).skip(1).collect();
        for to in targets {
            let target = &mut self.ports[to];
            if target.connected && (joined == 1 || target.registered_here(index)) {
                target.apply(index, GidEvent::Join);
                app.join_propagated(source, index);
            }
        }
        debug!(port = %source, index = index, joined = joined, "Join propagated");
    }

    fn propagate_leave(&mut self, pi: usize, index: usize, app: &mut dyn GarpApplication) {
        if !self.ports[pi].connected {
            return;
        }
        let source = self.ports[pi].number;
        if self.gip[index] == 0 {
            warn!(port = %source, index = index, "Leave propagated with no registered ports");
            return;
        }
        self.gip[index] -= 1;
        let remaining = self.gip[index];
        if remaining > 1 {
            return;
        }
        self.stats.leave_propagations += 1;

        let targets: Vec<usize> = self.ring_from(pi).skip(1).collect();
        for to in targets {
            let target = &mut self.ports[to];
            if target.connected && (remaining == 0 || target.registered_here(index)) {
                target.apply(index, GidEvent::Leave);
                app.leave_propagated(source, index);
            }
        }
        debug!(port = %source, index = index, remaining = remaining, "Leave propagated");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Actions and timers
    // ═══════════════════════════════════════════════════════════════════════

    fn gip_do_actions(&mut self, pi: usize, app: &mut dyn GarpApplication) {
        if !self.ports[pi].connected {
            self.port_do_actions(pi, app);
            return;
        }
        let ring: Vec<usize> = self
            .ring_from(pi)
            .filter(|&i| self.ports[i].connected)
            .collect();
        for i in ring {
            self.port_do_actions(i, app);
        }
    }

    fn port_do_actions(&mut self, pi: usize, app: &mut dyn GarpApplication) {
        let p = &mut self.ports[pi];
        if p.can_start_join_timer {
            p.last_to_transmit = p.last_transmitted;
            p.tx_pending = true;
            p.can_start_join_timer = false;
        }

        if !p.hold_tx {
            if p.can_schedule_tx_now {
                p.can_schedule_tx_now = false;
                self.transmit(pi, app);
            } else if (p.tx_pending || p.leaveall_countdown == 0) && !p.join_timer_running {
                p.join_timer_running = true;
                let port = p.number;
                let delay = self.join_delay();
                self.start_timer(port, GarpTimer::Join, delay);
            }
        }

        let p = &mut self.ports[pi];
        if p.can_start_leave_timer && !p.leave_timer_running {
            p.leave_timer_running = true;
            let port = p.number;
            let delay = self.config.leave_time / u32::from(LEAVEALL_COUNT);
            self.start_timer(port, GarpTimer::Leave, delay);
        }
        self.ports[pi].can_start_leave_timer = false;
    }

    /// Hand the port to the application for one PDU, then hold.
    fn transmit(&mut self, pi: usize, app: &mut dyn GarpApplication) {
        let last = self.last_gid_index;
        let port = self.ports[pi].number;
        {
            let mut cursor = TxCursor::new(&mut self.ports[pi], last);
            app.transmit(port, &mut cursor);
        }
        self.ports[pi].hold_tx = true;
        let hold = self.config.hold_time;
        self.start_timer(port, GarpTimer::Hold, hold);
    }

    /// Dispatch an expired timer.
    pub fn timer_expired(
        &mut self,
        port: PortNumber,
        timer: GarpTimer,
        app: &mut dyn GarpApplication,
    ) -> Result<(), GarpError> {
        match timer {
            GarpTimer::Join => self.join_timer_expired(port, app),
            GarpTimer::Leave => self.leave_timer_expired(port, app),
            GarpTimer::LeaveAll => self.leaveall_timer_expired(port),
            GarpTimer::Hold => self.hold_timer_expired(port, app),
        }
    }

    pub fn join_timer_expired(
        &mut self,
        port: PortNumber,
        app: &mut dyn GarpApplication,
    ) -> Result<(), GarpError> {
        let pi = self.find(port)?;
        self.ports[pi].join_timer_running = false;
        debug!(port = %port, "Join timer expired");
        self.transmit(pi, app);
        Ok(())
    }

    pub fn hold_timer_expired(
        &mut self,
        port: PortNumber,
        app: &mut dyn GarpApplication,
    ) -> Result<(), GarpError> {
        let pi = self.find(port)?;
        self.ports[pi].hold_tx = false;
        self.port_do_actions(pi, app);
        Ok(())
    }

    /// Advance every attribute one deregistration stage.
    pub fn leave_timer_expired(
        &mut self,
        port: PortNumber,
        app: &mut dyn GarpApplication,
    ) -> Result<(), GarpError> {
        let pi = self.find(port)?;
        self.ports[pi].leave_timer_running = false;
        debug!(port = %port, "Leave timer expired");
        for index in 0..self.last_gid_index {
            let indication = self.ports[pi].leave_timer_stage(index);
            if indication == Indication::Leave {
                self.indicate(pi, index, indication, app);
            }
        }
        self.gip_do_actions(pi, app);
        Ok(())
    }

    /// One stage of the leaveall period. The last stage schedules a LeaveAll.
    pub fn leaveall_timer_expired(&mut self, port: PortNumber) -> Result<(), GarpError> {
        let pi = self.find(port)?;
        if self.ports[pi].leaveall_countdown > 1 {
            self.ports[pi].leaveall_countdown -= 1;
            let stage = self.config.leaveall_time / u32::from(LEAVEALL_COUNT);
            self.start_timer(port, GarpTimer::LeaveAll, stage);
            return Ok(());
        }

        debug!(port = %port, "Leaveall period expired");
        let p = &mut self.ports[pi];
        p.leaveall_countdown = 0;
        p.can_start_join_timer = true;
        if !p.join_timer_running && !p.hold_tx {
            p.can_start_join_timer = false;
            p.join_timer_running = true;
            let delay = self.join_delay();
            self.start_timer(port, GarpTimer::Join, delay);
        }
        let period = self.leaveall_period();
        self.start_timer(port, GarpTimer::LeaveAll, period);
        Ok(())
    }

    fn join_delay(&mut self) -> Duration {
        let jitter: f64 = self.rng.gen();
        self.config.join_time.mul_f64(0.5 + jitter / 2.0)
    }

    /// First leaveall stage of a fresh period: a quarter of 1.0x to 1.5x leaveall time.
    fn leaveall_period(&mut self) -> Duration {
        let jitter: f64 = self.rng.gen();
        self.config.leaveall_time.mul_f64(1.0 + jitter / 2.0) / u32::from(LEAVEALL_COUNT)
    }

    fn start_timer(&mut self, port: PortNumber, timer: GarpTimer, duration: Duration) {
        debug!(port = %port, timer = %timer, duration = ?duration, "Starting GARP timer");
        self.timers.push(TimerRequest {
            port,
            timer,
            duration,
        });
    }
}
