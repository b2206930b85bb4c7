mod config;
mod engine;
mod sink;

pub use config::{parse_duration_minutes, MusicChoice, SessionConfig};
pub use engine::{
    BreathSession, SessionPhase, SessionState, TodayFn, COMPLETE_TEXT, DEFAULT_VISUAL_INTENSITY,
    IDLE_TEXT,
};
pub use sink::{Cue, PresentationSink, RecordingSink, SinkCall};
