//! Outstanding timers owned by one session.
//!
//! Every handle a session arms lives in exactly one role slot here until it
//! fires or is cancelled. Dropping a handle on the floor would leak the timer,
//! so the slots are the only place handles are kept.

use super::clock::{TimerHandle, TimerRole, TimerService};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TimerSet {
    countdown: Option<TimerHandle>,
    cycle_repeat: Option<TimerHandle>,
    hold_cue: Option<TimerHandle>,
    exhale_cue: Option<TimerHandle>,
    session_end: Option<TimerHandle>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, role: TimerRole) -> &mut Option<TimerHandle> {
        match role {
            TimerRole::CountdownTick => &mut self.countdown,
            TimerRole::CycleRepeat => &mut self.cycle_repeat,
            TimerRole::HoldCue => &mut self.hold_cue,
            TimerRole::ExhaleCue => &mut self.exhale_cue,
            TimerRole::SessionEnd => &mut self.session_end,
        }
    }

    pub fn get(&self, role: TimerRole) -> Option<TimerHandle> {
        match role {
            TimerRole::CountdownTick => self.countdown,
            TimerRole::CycleRepeat => self.cycle_repeat,
            TimerRole::HoldCue => self.hold_cue,
            TimerRole::ExhaleCue => self.exhale_cue,
            TimerRole::SessionEnd => self.session_end,
        }
    }

    /// Store `handle` in its role slot, cancelling whatever was there.
    pub fn install<C: TimerService>(&mut self, clock: &mut C, role: TimerRole, handle: TimerHandle) {
        if let Some(previous) = self.slot_mut(role).replace(handle) {
            if previous != handle {
                clock.cancel(previous);
            }
        }
    }

    /// Whether `handle` is the one currently held for `role`.
    ///
    /// A fired timer whose handle no longer matches its slot is stale and must
    /// be ignored by the owner.
    pub fn holds(&self, role: TimerRole, handle: TimerHandle) -> bool {
        self.get(role) == Some(handle)
    }

    /// Forget a one-shot handle that has just fired.
    pub fn clear_fired(&mut self, role: TimerRole, handle: TimerHandle) {
        let slot = self.slot_mut(role);
        if *slot == Some(handle) {
            *slot = None;
        }
    }

    /// Cancel and clear a single slot.
    pub fn release<C: TimerService>(&mut self, clock: &mut C, role: TimerRole) {
        if let Some(handle) = self.slot_mut(role).take() {
            clock.cancel(handle);
        }
    }

    /// Cancel both per-cycle cue timers.
    pub fn release_cycle_cues<C: TimerService>(&mut self, clock: &mut C) {
        self.release(clock, TimerRole::HoldCue);
        self.release(clock, TimerRole::ExhaleCue);
    }

    /// Cancel every slot. Safe on never-armed and already-fired slots.
    pub fn release_all<C: TimerService>(&mut self, clock: &mut C) {
        for role in Self::ROLES {
            self.release(clock, role);
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        Self::ROLES.iter().filter(|r| self.get(**r).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    const ROLES: [TimerRole; 5] = [
        TimerRole::CountdownTick,
        TimerRole::CycleRepeat,
        TimerRole::HoldCue,
        TimerRole::ExhaleCue,
        TimerRole::SessionEnd,
    ];
}
