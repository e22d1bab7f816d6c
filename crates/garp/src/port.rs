//! Per-port GID state: the attribute machines plus transmit bookkeeping.

use crate::gid::{ApplicantState, AttributeMessage, GidEvent, GidMachine, Indication};
use rapidspan_types::PortNumber;

/// Number of sub-intervals one leaveall period is staged into.
pub const LEAVEALL_COUNT: u8 = 4;

/// One attribute slot on one port, or a LeaveAll, chosen for transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transmission {
    LeaveAll,
    Attribute {
        index: usize,
        message: AttributeMessage,
    },
}

/// GID instance for one port.
#[derive(Debug, Clone)]
pub struct GidPort {
    pub(crate) number: PortNumber,
    pub(crate) machines: Vec<GidMachine>,
    pub(crate) connected: bool,

    pub(crate) last_transmitted: usize,
    pub(crate) last_to_transmit: usize,
    /// Applicant of `last_transmitted` before it was transmitted.
    pub(crate) untransmit_stash: ApplicantState,
    pub(crate) leaveall_countdown: u8,

    pub(crate) tx_pending: bool,
    pub(crate) hold_tx: bool,
    pub(crate) can_start_join_timer: bool,
    pub(crate) can_start_leave_timer: bool,
    pub(crate) can_schedule_tx_now: bool,
    pub(crate) join_timer_running: bool,
    pub(crate) leave_timer_running: bool,
}

impl GidPort {
    pub(crate) fn new(number: PortNumber, capacity: usize, last_gid_index: usize) -> Self {
        Self {
            number,
            machines: vec![GidMachine::default(); capacity],
            connected: false,
            last_transmitted: last_gid_index,
            last_to_transmit: last_gid_index,
            untransmit_stash: ApplicantState::Vo,
            leaveall_countdown: LEAVEALL_COUNT,
            tx_pending: false,
            hold_tx: false,
            can_start_join_timer: false,
            can_start_leave_timer: false,
            can_schedule_tx_now: false,
            join_timer_running: false,
            leave_timer_running: false,
        }
    }

    pub fn number(&self) -> PortNumber {
        self.number
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn machine(&self, index: usize) -> Option<&GidMachine> {
        self.machines.get(index)
    }

    pub fn registered_here(&self, index: usize) -> bool {
        self.machines
            .get(index)
            .is_some_and(GidMachine::registered_here)
    }

    /// Apply an event to one machine and fold its timer flags into the port.
    pub(crate) fn apply(&mut self, index: usize, event: GidEvent) -> Indication {
        let transition = self.machines[index].apply(event);
        if event == GidEvent::Join && transition.start_join_timer {
            self.can_schedule_tx_now = true;
        }
        self.can_start_join_timer |= transition.start_join_timer;
        self.can_start_leave_timer |= transition.start_leave_timer;
        transition.indication
    }

    /// Advance one machine's registrar a leave-timer stage.
    pub(crate) fn leave_timer_stage(&mut self, index: usize) -> Indication {
        let transition = self.machines[index].leave_timer_expired();
        self.can_start_leave_timer |= transition.start_leave_timer;
        transition.indication
    }

    /// Apply a LeaveAll to every attribute slot in use.
    pub(crate) fn leave_all(&mut self, last_gid_index: usize) {
        for index in 0..last_gid_index {
            self.apply(index, GidEvent::RxLeaveEmpty);
        }
    }

    fn next_tx(&mut self, last_gid_index: usize) -> Option<Transmission> {
        if self.hold_tx {
            return None;
        }

        if self.leaveall_countdown == 0 {
            self.leaveall_countdown = LEAVEALL_COUNT;
            self.leave_all(last_gid_index);
            self.tx_pending = true;
            self.last_to_transmit = self.last_transmitted;
            return Some(Transmission::LeaveAll);
        }

        if !self.tx_pending {
            return None;
        }

        // Round robin from just after the last transmitted slot, wrapping
        // once, through `last_to_transmit` inclusive.
        let mut start = self.last_transmitted + 1;
        if start >= last_gid_index {
            start = 0;
        }
        let stop = self.last_to_transmit;
        let (first, second) = if stop >= start {
            (start..(stop + 1).min(last_gid_index), 0..0)
        } else {
            (start..last_gid_index, 0..(stop + 1).min(last_gid_index))
        };

        for index in first.chain(second) {
            let before = self.machines[index].applicant;
            let outcome = self.machines[index].transmit();
            self.can_start_join_timer |= outcome.start_join_timer;
            if let Some(message) = outcome.message {
                self.last_transmitted = index;
                self.untransmit_stash = before;
                self.tx_pending = index != self.last_to_transmit;
                return Some(Transmission::Attribute { index, message });
            }
        }

        self.tx_pending = false;
        None
    }

    fn untransmit(&mut self, last_gid_index: usize) {
        if let Some(machine) = self.machines.get_mut(self.last_transmitted) {
            machine.applicant = self.untransmit_stash;
        }
        self.last_transmitted = if self.last_transmitted == 0 {
            last_gid_index.saturating_sub(1)
        } else {
            self.last_transmitted - 1
        };
        self.tx_pending = true;
    }
}

/// Transmit-side view of one port handed to the application while it builds a PDU.
pub struct TxCursor<'a> {
    port: &'a mut GidPort,
    last_gid_index: usize,
}

impl<'a> TxCursor<'a> {
    pub(crate) fn new(port: &'a mut GidPort, last_gid_index: usize) -> Self {
        Self {
            port,
            last_gid_index,
        }
    }

    pub fn port(&self) -> PortNumber {
        self.port.number
    }

    /// Next message to place in the PDU, or `None` when nothing is pending.
    pub fn next_tx(&mut self) -> Option<Transmission> {
        self.port.next_tx(self.last_gid_index)
    }

    /// Put back the last attribute returned by [`TxCursor::next_tx`].
    ///
    /// Used when the message did not fit in the PDU being built.
    pub fn untransmit(&mut self) {
        self.port.untransmit(self.last_gid_index);
    }
}
