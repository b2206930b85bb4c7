//! Timer service.
//!
//! Timers carry a [`TimerRole`] tag instead of a closure. When a timer comes
//! due the service hands the role back to its owner, which decides what the
//! callback means. The service has no internal thread: the owner polls it with
//! [`TimerService::pop_due`] up to the instant it wants to reach.
//!
//! ## Ordering
//!
//! Timers are ordered by `(due_ms, armed_seq)`, so timers due at the same
//! instant fire in the order they were armed. A repeating timer is re-armed
//! at `due + interval` as it fires and takes a fresh sequence number.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Opaque handle to an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn id(self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_raw(id: u64) -> Self {
        Self(id)
    }
}

/// What a timer means to the session that armed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerRole {
    /// 1-second countdown tick during preparation.
    CountdownTick,
    /// Repeating cycle driver.
    CycleRepeat,
    /// Per-cycle "Hold" cue.
    HoldCue,
    /// Per-cycle "Exhale" cue.
    ExhaleCue,
    /// Hard end-of-session deadline.
    SessionEnd,
}

/// A timer that came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    pub handle: TimerHandle,
    pub role: TimerRole,
    /// Nominal instant the timer was due at.
    pub at_ms: u64,
}

/// Schedules delayed and repeating timers and hands them back when due.
pub trait TimerService {
    /// Current instant in milliseconds on this service's timeline.
    fn now_ms(&self) -> u64;

    /// Arm a one-shot timer `delay_ms` from now.
    fn after(&mut self, delay_ms: u64, role: TimerRole) -> TimerHandle;

    /// Arm a repeating timer firing every `interval_ms`, first at now + interval.
    fn every(&mut self, interval_ms: u64, role: TimerRole) -> TimerHandle;

    /// Cancel a timer. No-op if it already fired, was cancelled or is unknown.
    fn cancel(&mut self, handle: TimerHandle);

    fn is_pending(&self, handle: TimerHandle) -> bool;

    /// Number of timers currently armed.
    fn outstanding(&self) -> usize;

    /// Instant of the earliest armed timer.
    fn next_due(&self) -> Option<u64>;

    /// Remove and return the earliest timer due at or before `until_ms`,
    /// moving the service's clock to its due instant.
    fn pop_due(&mut self, until_ms: u64) -> Option<FiredTimer>;

    /// Move the clock forward to `ms` once nothing else is due before it.
    fn settle_at(&mut self, ms: u64);
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    handle: TimerHandle,
    role: TimerRole,
    interval_ms: Option<u64>,
}

/// Deterministic timer service driven by explicit time advancement.
///
/// Used for simulated time in tests and, fed with real elapsed milliseconds,
/// as the timer queue of the terminal runner.
#[derive(Debug, Default)]
pub struct VirtualClock {
    now_ms: u64,
    next_id: u64,
    next_seq: u64,
    queue: BTreeMap<(u64, u64), Entry>,
    /// handle -> queue key, for cancellation.
    index: HashMap<TimerHandle, (u64, u64)>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn arm(&mut self, due_ms: u64, entry: Entry) {
        let key = (due_ms, self.next_seq);
        self.next_seq += 1;
        self.queue.insert(key, entry);
        self.index.insert(entry.handle, key);
    }

    fn new_handle(&mut self) -> TimerHandle {
        self.next_id += 1;
        TimerHandle(self.next_id)
    }
}

impl TimerService for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn after(&mut self, delay_ms: u64, role: TimerRole) -> TimerHandle {
        let handle = self.new_handle();
        let due = self.now_ms.saturating_add(delay_ms);
        self.arm(
            due,
            Entry {
                handle,
                role,
                interval_ms: None,
            },
        );
        trace!(handle = handle.0, ?role, due, "armed one-shot timer");
        handle
    }

    fn every(&mut self, interval_ms: u64, role: TimerRole) -> TimerHandle {
        // A zero interval would re-fire at the same instant forever.
        let interval_ms = interval_ms.max(1);
        let handle = self.new_handle();
        let due = self.now_ms.saturating_add(interval_ms);
        self.arm(
            due,
            Entry {
                handle,
                role,
                interval_ms: Some(interval_ms),
            },
        );
        trace!(handle = handle.0, ?role, interval_ms, "armed repeating timer");
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(key) = self.index.remove(&handle) {
            self.queue.remove(&key);
            trace!(handle = handle.0, "cancelled timer");
        }
    }

    fn is_pending(&self, handle: TimerHandle) -> bool {
        self.index.contains_key(&handle)
    }

    fn outstanding(&self) -> usize {
        self.queue.len()
    }

    fn next_due(&self) -> Option<u64> {
        self.queue.keys().next().map(|&(due, _)| due)
    }

    fn pop_due(&mut self, until_ms: u64) -> Option<FiredTimer> {
        let (&key, _) = self.queue.iter().next()?;
        if key.0 > until_ms {
            return None;
        }
        let entry = self.queue.remove(&key)?;
        self.index.remove(&entry.handle);
        self.now_ms = self.now_ms.max(key.0);

        if let Some(interval) = entry.interval_ms {
            self.arm(key.0.saturating_add(interval), entry);
        }

        Some(FiredTimer {
            handle: entry.handle,
            role: entry.role,
            at_ms: key.0,
        })
    }

    fn settle_at(&mut self, ms: u64) {
        self.now_ms = self.now_ms.max(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_fires_once_at_due_instant() {
        let mut clock = VirtualClock::new();
        let h = clock.after(500, TimerRole::HoldCue);
        assert!(clock.pop_due(499).is_none());

        let fired = clock.pop_due(1_000).unwrap();
        assert_eq!(fired.handle, h);
        assert_eq!(fired.at_ms, 500);
        assert_eq!(clock.now_ms(), 500);
        assert!(!clock.is_pending(h));
        assert!(clock.pop_due(10_000).is_none());
    }

    #[test]
    fn repeating_timer_rearms_until_cancelled() {
        let mut clock = VirtualClock::new();
        let h = clock.every(1_000, TimerRole::CountdownTick);

        let instants: Vec<u64> = std::iter::from_fn(|| clock.pop_due(3_500))
            .map(|f| f.at_ms)
            .collect();
        assert_eq!(instants, vec![1_000, 2_000, 3_000]);
        assert!(clock.is_pending(h));

        clock.cancel(h);
        assert_eq!(clock.outstanding(), 0);
        assert!(clock.pop_due(u64::MAX).is_none());
    }

    #[test]
    fn same_instant_fires_in_arm_order() {
        let mut clock = VirtualClock::new();
        let first = clock.every(19_000, TimerRole::CycleRepeat);
        let second = clock.after(19_000, TimerRole::SessionEnd);

        assert_eq!(clock.pop_due(19_000).unwrap().handle, first);
        assert_eq!(clock.pop_due(19_000).unwrap().handle, second);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut clock = VirtualClock::new();
        let h = clock.after(10, TimerRole::ExhaleCue);
        clock.cancel(h);
        clock.cancel(h);
        clock.cancel(TimerHandle(9_999));
        assert_eq!(clock.outstanding(), 0);
    }

    #[test]
    fn settle_never_moves_backwards() {
        let mut clock = VirtualClock::new();
        clock.settle_at(1_000);
        clock.settle_at(500);
        assert_eq!(clock.now_ms(), 1_000);
        clock.after(250, TimerRole::HoldCue);
        assert_eq!(clock.next_due(), Some(1_250));
    }
}
