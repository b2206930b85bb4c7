use serde::{Deserialize, Serialize};

pub const INHALE_MS: u64 = 4_000;
pub const HOLD_MS: u64 = 7_000;
pub const EXHALE_MS: u64 = 8_000;

/// One Inhale -> Hold -> Exhale repetition.
pub const CYCLE_DURATION_MS: u64 = INHALE_MS + HOLD_MS + EXHALE_MS;

/// Preparation countdown starts at this value.
pub const COUNTDOWN_SECONDS: u32 = 5;
pub const COUNTDOWN_TICK_MS: u64 = 1_000;

/// From `start` to the first cycle: the countdown shows 5..=0, and the tick
/// after 0 begins breathing.
pub const PREPARATION_MS: u64 = (COUNTDOWN_SECONDS as u64 + 1) * COUNTDOWN_TICK_MS;

// Cue timers of one cycle must be spent before the next cycle is driven.
const _: () = assert!(INHALE_MS + HOLD_MS < CYCLE_DURATION_MS);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePhase {
    Inhale,
    Hold,
    Exhale,
}

impl CyclePhase {
    pub const ALL: [CyclePhase; 3] = [CyclePhase::Inhale, CyclePhase::Hold, CyclePhase::Exhale];

    pub const fn duration_ms(self) -> u64 {
        match self {
            CyclePhase::Inhale => INHALE_MS,
            CyclePhase::Hold => HOLD_MS,
            CyclePhase::Exhale => EXHALE_MS,
        }
    }

    /// Offset from the start of the cycle at which this phase begins.
    pub const fn offset_ms(self) -> u64 {
        match self {
            CyclePhase::Inhale => 0,
            CyclePhase::Hold => INHALE_MS,
            CyclePhase::Exhale => INHALE_MS + HOLD_MS,
        }
    }

    pub const fn instruction(self) -> &'static str {
        match self {
            CyclePhase::Inhale => "Inhale...",
            CyclePhase::Hold => "Hold...",
            CyclePhase::Exhale => "Exhale...",
        }
    }
}

/// Derived, immutable timing for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPlan {
    pub total_cycles: u64,
    pub total_duration_ms: u64,
}

impl SessionPlan {
    /// `round(minutes * 60 / 19)` cycles.
    ///
    /// 19 is odd, so `minutes * 60 / 19` is never exactly half-way and the
    /// integer form below matches ordinary rounding.
    pub fn for_minutes(minutes: u32) -> Self {
        let cycle_secs = CYCLE_DURATION_MS / 1_000;
        let total_secs = u64::from(minutes) * 60;
        Self::from_cycles((total_secs * 2 + cycle_secs) / (cycle_secs * 2))
    }

    pub fn from_cycles(total_cycles: u64) -> Self {
        Self {
            total_cycles,
            total_duration_ms: total_cycles.saturating_mul(CYCLE_DURATION_MS),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_cycles == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn cycle_is_nineteen_seconds() {
        assert_eq!(CYCLE_DURATION_MS, 19_000);
        let sum: u64 = CyclePhase::ALL.iter().map(|p| p.duration_ms()).sum();
        assert_eq!(sum, CYCLE_DURATION_MS);
    }

    #[test]
    fn phase_offsets() {
        assert_eq!(CyclePhase::Inhale.offset_ms(), 0);
        assert_eq!(CyclePhase::Hold.offset_ms(), 4_000);
        assert_eq!(CyclePhase::Exhale.offset_ms(), 11_000);
    }

    #[test]
    fn known_plans() {
        // 60 / 19 = 3.16
        assert_eq!(SessionPlan::for_minutes(1).total_cycles, 3);
        // 300 / 19 = 15.79
        assert_eq!(SessionPlan::for_minutes(5).total_cycles, 16);
        assert_eq!(SessionPlan::for_minutes(5).total_duration_ms, 304_000);
        // 600 / 19 = 31.58
        assert_eq!(SessionPlan::for_minutes(10).total_cycles, 32);
    }

    #[test]
    fn zero_cycle_plan_is_empty() {
        let plan = SessionPlan::from_cycles(0);
        assert!(plan.is_empty());
        assert_eq!(plan.total_duration_ms, 0);
    }

    proptest! {
        #[test]
        fn plan_matches_float_rounding(minutes in 1u32..10_000) {
            let plan = SessionPlan::for_minutes(minutes);
            let expected = (f64::from(minutes) * 60.0 / 19.0).round() as u64;
            prop_assert_eq!(plan.total_cycles, expected);
            prop_assert_eq!(plan.total_duration_ms, expected * 19_000);
        }
    }
}
