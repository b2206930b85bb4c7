//! Presentation boundary.
//!
//! The session never reads presentation state; it only tells the sink what to
//! show and play.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cue {
    /// Phase change within a cycle.
    Bell,
    /// Session completed.
    Gong,
}

pub trait PresentationSink {
    fn show_text(&mut self, message: &str);

    /// Orb opacity, 0.0 ..= 1.0.
    fn set_visual_intensity(&mut self, opacity: f64);

    fn set_breathing_animation(&mut self, active: bool);

    fn play_cue(&mut self, cue: Cue);

    /// Start looping background music.
    fn start_music(&mut self, track: &str);

    /// Stop background music and rewind it to the start.
    fn stop_music(&mut self);

    /// `true` shows the running controls (stop), hiding start and the
    /// duration/music/streak pickers; `false` restores them.
    fn set_controls_running(&mut self, running: bool);

    fn show_streak_count(&mut self, count: u32);
}

/// One call made on a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum SinkCall {
    ShowText { message: String },
    VisualIntensity { opacity: f64 },
    BreathingAnimation { active: bool },
    PlayCue { cue: Cue },
    StartMusic { track: String },
    StopMusic,
    ControlsRunning { running: bool },
    StreakCount { count: u32 },
}

/// Sink that records every call, for tests and transcripts.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    calls: Vec<SinkCall>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[SinkCall] {
        &self.calls
    }

    /// Remove and return everything recorded so far.
    pub fn take(&mut self) -> Vec<SinkCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn texts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SinkCall::ShowText { message } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SinkCall::PlayCue { cue } => Some(*cue),
                _ => None,
            })
            .collect()
    }
}

impl PresentationSink for RecordingSink {
    fn show_text(&mut self, message: &str) {
        self.calls.push(SinkCall::ShowText {
            message: message.to_string(),
        });
    }

    fn set_visual_intensity(&mut self, opacity: f64) {
        self.calls.push(SinkCall::VisualIntensity { opacity });
    }

    fn set_breathing_animation(&mut self, active: bool) {
        self.calls.push(SinkCall::BreathingAnimation { active });
    }

    fn play_cue(&mut self, cue: Cue) {
        self.calls.push(SinkCall::PlayCue { cue });
    }

    fn start_music(&mut self, track: &str) {
        self.calls.push(SinkCall::StartMusic {
            track: track.to_string(),
        });
    }

    fn stop_music(&mut self) {
        self.calls.push(SinkCall::StopMusic);
    }

    fn set_controls_running(&mut self, running: bool) {
        self.calls.push(SinkCall::ControlsRunning { running });
    }

    fn show_streak_count(&mut self, count: u32) {
        self.calls.push(SinkCall::StreakCount { count });
    }
}
