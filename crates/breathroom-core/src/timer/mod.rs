mod clock;
mod pattern;
mod timer_set;

pub use clock::{FiredTimer, TimerHandle, TimerRole, TimerService, VirtualClock};
pub use pattern::{
    CyclePhase, SessionPlan, COUNTDOWN_SECONDS, COUNTDOWN_TICK_MS, CYCLE_DURATION_MS, EXHALE_MS,
    HOLD_MS, INHALE_MS, PREPARATION_MS,
};
pub use timer_set::TimerSet;
