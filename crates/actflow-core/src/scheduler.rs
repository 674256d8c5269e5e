//! Timer scheduling
//!
//! Players never sleep. Every delay goes through a [`Scheduler`], which hands
//! back a [`TimerHandle`] for cancellation. When the timer fires, its
//! [`TimerToken`] is routed back to the owning player. Each token carries
//! the player's playback generation, so a fire that outlives `stop()` is
//! ignored even if cancellation was missed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Identifies one player within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// Payload delivered when a timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    pub player: PlayerId,
    pub generation: u64,
}

/// Handle used to cancel a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Deferred callback scheduling
pub trait Scheduler {
    /// Current time on the scheduler's clock
    fn now(&self) -> Duration;

    /// Arrange for `token` to fire after `delay`
    fn schedule(&mut self, delay: Duration, token: TimerToken) -> TimerHandle;

    /// Arrange for `token` to fire on the next advance of the clock, never
    /// within the advance that is currently firing timers
    fn schedule_yield(&mut self, token: TimerToken) -> TimerHandle {
        self.schedule(Duration::ZERO, token)
    }

    /// Cancel a pending timer. Returns false if it already fired or was cancelled.
    fn cancel(&mut self, handle: TimerHandle) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    token: TimerToken,
    yielded: bool,
}

/// Bounds of one [`TimerQueue`] advance
#[derive(Debug, Clone, Copy)]
pub struct AdvanceWindow {
    until: Duration,
    barrier: u64,
}

impl AdvanceWindow {
    pub fn until(&self) -> Duration {
        self.until
    }
}

/// Virtual-clock timer queue.
///
/// Time only moves when the owner advances it, which makes playback fully
/// deterministic. Timers fire in deadline order, ties in scheduling order.
/// Every timer due inside an advance fires in it, including zero-delay timers
/// armed along the way. Only yields armed during an advance wait for the next
/// one, so a busy player still hands control back to the host.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now: Duration,
    next_handle: u64,
    pending: BTreeMap<(Duration, TimerHandle), PendingTimer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timers waiting to fire
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Deadline of the earliest pending timer
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Open a window that fires everything due within `by` from now
    pub fn begin_advance(&mut self, by: Duration) -> AdvanceWindow {
        self.begin_advance_to(self.now + by)
    }

    /// Open a window that fires everything due up to the absolute time `until`
    pub fn begin_advance_to(&mut self, until: Duration) -> AdvanceWindow {
        AdvanceWindow {
            until: until.max(self.now),
            barrier: self.next_handle,
        }
    }

    /// Remove and return the next timer that may fire inside `window`,
    /// moving the clock to its deadline
    pub fn pop_due(&mut self, window: &AdvanceWindow) -> Option<TimerToken> {
        let key = self
            .pending
            .iter()
            .take_while(|((deadline, _), _)| *deadline <= window.until)
            .find(|((_, handle), timer)| !timer.yielded || handle.0 < window.barrier)
            .map(|(key, _)| *key)?;

        let timer = self.pending.remove(&key)?;
        self.now = self.now.max(key.0);
        Some(timer.token)
    }

    fn insert(&mut self, delay: Duration, token: TimerToken, yielded: bool) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        let deadline = self.now + delay;
        self.pending
            .insert((deadline, handle), PendingTimer { token, yielded });
        tracing::trace!(?handle, ?deadline, yielded, "timer armed");
        handle
    }

    /// Close the window, leaving the clock at its end
    pub fn end_advance(&mut self, window: AdvanceWindow) {
        self.now = self.now.max(window.until);
    }
}

impl Scheduler for TimerQueue {
    fn now(&self) -> Duration {
        self.now
    }

    fn schedule(&mut self, delay: Duration, token: TimerToken) -> TimerHandle {
        self.insert(delay, token, false)
    }

    fn schedule_yield(&mut self, token: TimerToken) -> TimerHandle {
        self.insert(Duration::ZERO, token, true)
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        let key = self
            .pending
            .keys()
            .find(|(_, h)| *h == handle)
            .copied();
        match key {
            Some(key) => self.pending.remove(&key).is_some(),
            None => false,
        }
    }
}
