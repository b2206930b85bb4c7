//! # Breathroom Core Library
//!
//! Core logic for Breathroom, a guided-breathing session controller. The CLI
//! binary is a thin terminal layer over this library.
//!
//! ## Architecture
//!
//! - **Timer Service**: polled timer queue handing role-tagged timers back to
//!   their owner; no internal threads
//! - **Session**: state machine sequencing countdown, breathing cycles and
//!   completion, talking to the outside world through a presentation sink
//! - **Streak**: pure daily-streak policy plus a key-value backed store
//! - **Storage**: SQLite session history and TOML configuration
//!
//! ## Key Components
//!
//! - [`BreathSession`]: Session state machine
//! - [`VirtualClock`]: Deterministic timer service
//! - [`next_streak`]: Streak policy
//! - [`Database`]: Session history and key-value persistence
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod session;
pub mod storage;
pub mod streak;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, SessionError};
pub use events::SessionEvent;
pub use session::{
    BreathSession, Cue, MusicChoice, PresentationSink, RecordingSink, SessionConfig, SessionState,
};
pub use storage::{Config, Database, SessionEntry, Stats};
pub use streak::{next_streak, MemoryStreakStore, StreakRecord, StreakStore};
pub use timer::{CyclePhase, SessionPlan, TimerService, VirtualClock};
