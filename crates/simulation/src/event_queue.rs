//! Time-ordered event queue with replaceable timers.

use crate::SwitchIndex;
use rapidspan_core::{Event, TimerId};
use std::collections::BTreeMap;
use std::time::Duration;

/// Position of an event in the queue.
///
/// Ordered by time, then event priority, then switch, then insertion
/// sequence, so ties always break the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey {
    pub time: Duration,
    pub priority: u8,
    pub switch: SwitchIndex,
    pub sequence: u64,
}

/// Pending events for every switch in a simulation.
#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    events: BTreeMap<EventKey, (SwitchIndex, Event)>,
    /// Key of each timer's pending expiry.
    timers: BTreeMap<(SwitchIndex, TimerId), EventKey>,
    sequence: u64,
}

impl EventQueue {
    pub(crate) fn push(&mut self, time: Duration, switch: SwitchIndex, event: Event) -> EventKey {
        let key = EventKey {
            time,
            priority: event.priority(),
            switch,
            sequence: self.sequence,
        };
        self.sequence += 1;
        self.events.insert(key, (switch, event));
        key
    }

    /// Schedule a timer expiry, replacing any pending expiry of the same
    /// timer.
    pub(crate) fn set_timer(&mut self, time: Duration, switch: SwitchIndex, id: TimerId) {
        if let Some(previous) = self.timers.remove(&(switch, id)) {
            self.events.remove(&previous);
        }
        let key = self.push(time, switch, timer_event(id));
        self.timers.insert((switch, id), key);
    }

    pub(crate) fn pop(&mut self) -> Option<(EventKey, SwitchIndex, Event)> {
        let (key, (switch, event)) = self.events.pop_first()?;
        if let Some(id) = timer_id(&event) {
            if self.timers.get(&(switch, id)) == Some(&key) {
                self.timers.remove(&(switch, id));
            }
        }
        Some((key, switch, event))
    }

    pub(crate) fn next_time(&self) -> Option<Duration> {
        self.events.keys().next().map(|key| key.time)
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }
}

fn timer_event(id: TimerId) -> Event {
    match id {
        TimerId::Tick => Event::Tick,
        TimerId::Garp { port, timer } => Event::GarpTimer { port, timer },
    }
}

fn timer_id(event: &Event) -> Option<TimerId> {
    match event {
        Event::Tick => Some(TimerId::Tick),
        Event::GarpTimer { port, timer } => Some(TimerId::Garp {
            port: *port,
            timer: *timer,
        }),
        _ => None,
    }
}
