//! Core traits for state machines.

use crate::{Action, Event};
use std::time::Duration;

/// A switch-level state machine that processes events.
///
/// All protocol logic is implemented as state machines that are:
///
/// - **Synchronous**: No async, no `.await`
/// - **Deterministic**: Same state + event = same actions
/// - **Pure-ish**: Mutates self, but performs no I/O
///
/// # Example
///
/// ```ignore
/// impl StateMachine for Switch {
///     fn handle(&mut self, event: Event) -> Vec<Action> {
///         match event {
///             Event::Tick => self.on_tick(),
///             Event::BpduReceived { port, frame } => self.on_bpdu(port, &frame),
///             // ... etc
///         }
///     }
///
///     fn set_time(&mut self, now: Duration) {
///         self.now = now;
///     }
/// }
/// ```
pub trait StateMachine {
    /// Process an event, returning actions to perform.
    ///
    /// Every event drives the protocol engines to a fixpoint before this
    /// returns, so no intermediate state is observable from outside.
    fn handle(&mut self, event: Event) -> Vec<Action>;

    /// Set the current time.
    ///
    /// Called by the runner before each `handle()` call.
    fn set_time(&mut self, now: Duration);

    /// Get the current time.
    ///
    /// Returns the time that was last set via `set_time()`.
    fn now(&self) -> Duration;
}
