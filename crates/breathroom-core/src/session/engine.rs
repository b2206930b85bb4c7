//! Breathing session state machine.
//!
//! The session owns its timer service, its presentation sink and its streak
//! store. It has no internal thread: timers are delivered back through
//! [`BreathSession::on_timer`], usually by [`BreathSession::advance_to`].
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Preparing(5..=0) -> Breathing(cycles_completed) -> Ending -> Idle
//!              \_________________________________________/
//!                         abort (Ending -> Idle)
//! ```
//!
//! Every exit goes through [`BreathSession::end`], which releases the whole
//! [`TimerSet`] before anything else happens.
//!
//! ## Usage
//!
//! ```ignore
//! let mut session = BreathSession::new(VirtualClock::new(), sink, store);
//! session.start(SessionConfig::new(5, MusicChoice::None)?)?;
//! // In a loop:
//! session.advance_to(elapsed_ms);
//! ```

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::sink::{Cue, PresentationSink};
use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::streak::{next_streak, StreakRecord, StreakStore};
use crate::timer::{
    CyclePhase, FiredTimer, SessionPlan, TimerRole, TimerService, TimerSet, COUNTDOWN_SECONDS,
    COUNTDOWN_TICK_MS, CYCLE_DURATION_MS,
};

pub const COMPLETE_TEXT: &str = "Session Complete";
pub const IDLE_TEXT: &str = "Press Start to Begin";

/// Visual intensity while breathing unless overridden.
pub const DEFAULT_VISUAL_INTENSITY: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Preparing { seconds_remaining: u32 },
    Breathing { cycles_completed: u64 },
    Ending,
}

/// [`SessionState`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Preparing,
    Breathing,
    Ending,
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Idle => SessionPhase::Idle,
            SessionState::Preparing { .. } => SessionPhase::Preparing,
            SessionState::Breathing { .. } => SessionPhase::Breathing,
            SessionState::Ending => SessionPhase::Ending,
        }
    }
}

/// Per-session data, dropped on every return to Idle.
#[derive(Debug, Clone)]
struct ActiveSession {
    config: SessionConfig,
    plan: SessionPlan,
    cycles_started: u64,
    music_playing: bool,
    started_at: DateTime<Utc>,
}

/// Source of "today" for streak bookkeeping.
pub type TodayFn = Box<dyn Fn() -> NaiveDate>;

pub struct BreathSession<C, P, S> {
    clock: C,
    sink: P,
    store: S,
    state: SessionState,
    timers: TimerSet,
    active: Option<ActiveSession>,
    visual_intensity: f64,
    today: TodayFn,
}

impl<C, P, S> BreathSession<C, P, S>
where
    C: TimerService,
    P: PresentationSink,
    S: StreakStore,
{
    /// Create an idle session. "Today" defaults to the local calendar date.
    pub fn new(clock: C, sink: P, store: S) -> Self {
        Self {
            clock,
            sink,
            store,
            state: SessionState::Idle,
            timers: TimerSet::new(),
            active: None,
            visual_intensity: DEFAULT_VISUAL_INTENSITY,
            today: Box::new(|| Local::now().date_naive()),
        }
    }

    pub fn with_today(mut self, today: impl Fn() -> NaiveDate + 'static) -> Self {
        self.today = Box::new(today);
        self
    }

    pub fn with_visual_intensity(mut self, opacity: f64) -> Self {
        self.visual_intensity = opacity.clamp(0.0, 1.0);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    pub fn plan(&self) -> Option<SessionPlan> {
        self.active.as_ref().map(|a| a.plan)
    }

    pub fn config(&self) -> Option<&SessionConfig> {
        self.active.as_ref().map(|a| &a.config)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.active.as_ref().map(|a| a.started_at)
    }

    pub fn cycles_started(&self) -> u64 {
        self.active.as_ref().map(|a| a.cycles_started).unwrap_or(0)
    }

    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut P {
        &mut self.sink
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Streak count as it should be displayed right now. 0 if unreadable.
    pub fn streak_count(&self) -> u32 {
        match self.store.load() {
            Ok(record) => record.live_count((self.today)()),
            Err(e) => {
                warn!(error = %e, "failed to read streak record");
                0
            }
        }
    }

    /// Serializable view of the current state.
    pub fn status(&self) -> SessionEvent {
        let seconds_remaining = match self.state {
            SessionState::Preparing { seconds_remaining } => Some(seconds_remaining),
            _ => None,
        };
        SessionEvent::StateSnapshot {
            phase: self.state.phase(),
            seconds_remaining,
            cycles_started: self.cycles_started(),
            total_cycles: self.plan().map(|p| p.total_cycles).unwrap_or(0),
            outstanding_timers: self.timers.len(),
            at: Utc::now(),
        }
    }

    pub fn into_parts(self) -> (C, P, S) {
        (self.clock, self.sink, self.store)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Show the idle screen: prompt, current streak, start controls.
    pub fn present_idle(&mut self) {
        if !self.is_idle() {
            return;
        }
        let streak = self.streak_count();
        self.sink.show_text(IDLE_TEXT);
        self.sink.show_streak_count(streak);
        self.sink.set_controls_running(false);
    }

    /// Begin the preparation countdown.
    ///
    /// # Errors
    /// [`SessionError::AlreadyRunning`] unless idle; the running session is
    /// left untouched. [`SessionError::InvalidDuration`] for a zero duration.
    /// No timer is armed when an error is returned.
    pub fn start(&mut self, config: SessionConfig) -> Result<SessionEvent, SessionError> {
        if !self.is_idle() {
            warn!(state = ?self.state, "start rejected: session already running");
            return Err(SessionError::AlreadyRunning);
        }
        config.validate()?;
        debug_assert!(self.timers.is_empty(), "idle session holds timers");

        let plan = config.plan();
        let started_at = Utc::now();
        info!(
            minutes = config.duration_minutes,
            cycles = plan.total_cycles,
            music = %config.music,
            "session starting"
        );

        self.sink.set_controls_running(true);
        self.state = SessionState::Preparing {
            seconds_remaining: COUNTDOWN_SECONDS,
        };
        self.sink.show_text(&COUNTDOWN_SECONDS.to_string());

        let tick = self.clock.every(COUNTDOWN_TICK_MS, TimerRole::CountdownTick);
        self.timers
            .install(&mut self.clock, TimerRole::CountdownTick, tick);

        let event = SessionEvent::SessionStarted {
            duration_minutes: config.duration_minutes,
            total_cycles: plan.total_cycles,
            music: config.music.track().map(str::to_string),
            at: started_at,
        };
        self.active = Some(ActiveSession {
            config,
            plan,
            cycles_started: 0,
            music_playing: false,
            started_at,
        });
        Ok(event)
    }

    /// Stop the running session without completing it.
    pub fn abort(&mut self) -> Option<SessionEvent> {
        self.end(false)
    }

    /// Finish the session. Returns `None` if already idle.
    ///
    /// Releases every outstanding timer first, then stops music, presents the
    /// outcome, updates the streak on completion and returns to Idle.
    pub fn end(&mut self, completed: bool) -> Option<SessionEvent> {
        if matches!(self.state, SessionState::Idle | SessionState::Ending) {
            return None;
        }
        let phase = self.state.phase();
        self.state = SessionState::Ending;
        self.timers.release_all(&mut self.clock);

        let active = self.active.take();
        let cycles = active.as_ref().map(|a| a.cycles_started).unwrap_or(0);
        if active.as_ref().is_some_and(|a| a.music_playing) {
            self.sink.stop_music();
        }
        self.sink.set_breathing_animation(false);
        self.sink.set_visual_intensity(0.0);

        let event = if completed {
            self.sink.show_text(COMPLETE_TEXT);
            self.sink.play_cue(Cue::Gong);
            let streak = self.record_completion();
            self.sink.show_streak_count(streak);
            info!(cycles, streak, "session completed");
            SessionEvent::SessionCompleted {
                cycles,
                streak,
                at: Utc::now(),
            }
        } else {
            self.sink.show_text(IDLE_TEXT);
            let streak = self.streak_count();
            self.sink.show_streak_count(streak);
            info!(cycles, ?phase, "session aborted");
            SessionEvent::SessionAborted {
                cycles,
                phase,
                at: Utc::now(),
            }
        };

        self.sink.set_controls_running(false);
        self.state = SessionState::Idle;
        Some(event)
    }

    /// Handle a timer delivered by the timer service.
    pub fn on_timer(&mut self, fired: FiredTimer) -> Vec<SessionEvent> {
        if !self.timers.holds(fired.role, fired.handle) {
            debug!(handle = fired.handle.id(), role = ?fired.role, "ignoring stale timer");
            return Vec::new();
        }
        match fired.role {
            TimerRole::CountdownTick => self.countdown_tick(),
            TimerRole::CycleRepeat => self.cycle_boundary().into_iter().collect(),
            TimerRole::HoldCue => {
                self.timers.clear_fired(fired.role, fired.handle);
                self.cue(CyclePhase::Hold);
                Vec::new()
            }
            TimerRole::ExhaleCue => {
                self.timers.clear_fired(fired.role, fired.handle);
                self.cue(CyclePhase::Exhale);
                Vec::new()
            }
            TimerRole::SessionEnd => {
                self.timers.clear_fired(fired.role, fired.handle);
                self.end(true).into_iter().collect()
            }
        }
    }

    /// Deliver every timer due up to `target_ms`, in order.
    pub fn advance_to(&mut self, target_ms: u64) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(fired) = self.clock.pop_due(target_ms) {
            events.extend(self.on_timer(fired));
        }
        self.clock.settle_at(target_ms);
        events
    }

    pub fn advance_by(&mut self, delta_ms: u64) -> Vec<SessionEvent> {
        let target = self.clock.now_ms().saturating_add(delta_ms);
        self.advance_to(target)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn countdown_tick(&mut self) -> Vec<SessionEvent> {
        let SessionState::Preparing { seconds_remaining } = self.state else {
            return Vec::new();
        };
        if seconds_remaining > 0 {
            let next = seconds_remaining - 1;
            self.state = SessionState::Preparing {
                seconds_remaining: next,
            };
            self.sink.show_text(&next.to_string());
            return Vec::new();
        }

        self.timers.release(&mut self.clock, TimerRole::CountdownTick);
        self.begin_breathing()
    }

    fn begin_breathing(&mut self) -> Vec<SessionEvent> {
        let Some(active) = self.active.as_mut() else {
            return Vec::new();
        };
        let plan = active.plan;
        if plan.is_empty() {
            debug!("zero-cycle plan, completing after preparation");
            return self.end(true).into_iter().collect();
        }

        self.state = SessionState::Breathing {
            cycles_completed: 0,
        };
        if let Some(track) = active.config.music.track() {
            self.sink.start_music(track);
            active.music_playing = true;
        }
        self.sink.set_visual_intensity(self.visual_intensity);
        self.sink.set_breathing_animation(true);
        debug!(cycles = plan.total_cycles, "breathing started");

        let mut events = vec![SessionEvent::BreathingStarted {
            total_cycles: plan.total_cycles,
            total_duration_ms: plan.total_duration_ms,
            at: Utc::now(),
        }];
        events.push(self.drive_cycle(0, plan.total_cycles));

        let repeat = self.clock.every(CYCLE_DURATION_MS, TimerRole::CycleRepeat);
        self.timers
            .install(&mut self.clock, TimerRole::CycleRepeat, repeat);
        let end = self.clock.after(plan.total_duration_ms, TimerRole::SessionEnd);
        self.timers
            .install(&mut self.clock, TimerRole::SessionEnd, end);
        events
    }

    fn cycle_boundary(&mut self) -> Option<SessionEvent> {
        let SessionState::Breathing { cycles_completed } = self.state else {
            return None;
        };
        let total = self.plan()?.total_cycles;
        let completed = cycles_completed + 1;
        self.state = SessionState::Breathing {
            cycles_completed: completed,
        };

        if completed >= total {
            // Last boundary coincides with the end timer; nothing left to drive.
            self.timers.release(&mut self.clock, TimerRole::CycleRepeat);
            return None;
        }
        Some(self.drive_cycle(completed, total))
    }

    fn drive_cycle(&mut self, cycle: u64, total_cycles: u64) -> SessionEvent {
        debug_assert!(
            self.timers.get(TimerRole::HoldCue).is_none()
                && self.timers.get(TimerRole::ExhaleCue).is_none(),
            "cue timers of the previous cycle still pending"
        );
        self.timers.release_cycle_cues(&mut self.clock);

        if let Some(active) = self.active.as_mut() {
            active.cycles_started += 1;
        }
        self.cue(CyclePhase::Inhale);

        let hold = self
            .clock
            .after(CyclePhase::Hold.offset_ms(), TimerRole::HoldCue);
        self.timers.install(&mut self.clock, TimerRole::HoldCue, hold);
        let exhale = self
            .clock
            .after(CyclePhase::Exhale.offset_ms(), TimerRole::ExhaleCue);
        self.timers
            .install(&mut self.clock, TimerRole::ExhaleCue, exhale);

        SessionEvent::CycleStarted {
            cycle,
            total_cycles,
            at: Utc::now(),
        }
    }

    fn cue(&mut self, phase: CyclePhase) {
        self.sink.show_text(phase.instruction());
        self.sink.play_cue(Cue::Bell);
    }

    /// Apply the streak policy for today and persist it. Returns the new count.
    ///
    /// If the stored record cannot be read it is left alone; today's
    /// completion alone is reported.
    fn record_completion(&mut self) -> u32 {
        let today = (self.today)();
        let current = match self.store.load() {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "failed to read streak record, not updating it");
                return next_streak(today, &StreakRecord::default()).count;
            }
        };
        let next = next_streak(today, &current);
        if next != current {
            if let Err(e) = self.store.save(&next) {
                error!(error = %e, "failed to persist streak");
            }
        }
        next.count
    }
}
