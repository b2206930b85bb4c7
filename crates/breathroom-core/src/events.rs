use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionPhase;

/// Milestones produced by the session state machine.
///
/// Presentation goes through the sink; events are for hosts that log,
/// persist history or print machine-readable progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    SessionStarted {
        duration_minutes: u32,
        total_cycles: u64,
        music: Option<String>,
        at: DateTime<Utc>,
    },
    BreathingStarted {
        total_cycles: u64,
        total_duration_ms: u64,
        at: DateTime<Utc>,
    },
    CycleStarted {
        /// Zero-based.
        cycle: u64,
        total_cycles: u64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        cycles: u64,
        streak: u32,
        at: DateTime<Utc>,
    },
    SessionAborted {
        cycles: u64,
        phase: SessionPhase,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: SessionPhase,
        seconds_remaining: Option<u32>,
        cycles_started: u64,
        total_cycles: u64,
        outstanding_timers: usize,
        at: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Whether this event ends a session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::SessionCompleted { .. } | SessionEvent::SessionAborted { .. }
        )
    }
}
