//! Terminal presentation sink.

use std::io::Write;

use breathroom_core::session::SinkCall;
use breathroom_core::{Cue, PresentationSink};

/// Prints session presentation to stdout, as text or as JSON lines.
pub struct TerminalSink {
    json: bool,
    show_streak: bool,
}

impl TerminalSink {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            show_streak: true,
        }
    }

    pub fn with_streak(mut self, show: bool) -> Self {
        self.show_streak = show;
        self
    }

    fn render(&mut self, call: SinkCall) {
        let mut out = std::io::stdout().lock();
        let written = if self.json {
            match serde_json::to_string(&call) {
                Ok(line) => writeln!(out, "{line}"),
                Err(e) => {
                    tracing::warn!(error = %e, "could not encode sink call");
                    Ok(())
                }
            }
        } else {
            match human_line(&call) {
                Some(line) => writeln!(out, "{line}"),
                None => Ok(()),
            }
        };
        if let Err(e) = written.and_then(|_| out.flush()) {
            tracing::debug!(error = %e, "stdout unavailable");
        }
    }
}

fn human_line(call: &SinkCall) -> Option<String> {
    match call {
        SinkCall::ShowText { message } => Some(format!("  {message}")),
        // Terminal bell for phase changes.
        SinkCall::PlayCue { cue: Cue::Bell } => Some("\x07".into()),
        SinkCall::PlayCue { cue: Cue::Gong } => Some("\x07  ~ gong ~".into()),
        SinkCall::StartMusic { track } => Some(format!("  [music: {track}]")),
        SinkCall::StopMusic => Some("  [music stopped]".into()),
        SinkCall::ControlsRunning { running: true } => Some("  (Ctrl-C to stop)".into()),
        SinkCall::StreakCount { count } => Some(format!(
            "  Streak: {count} day{}",
            if *count == 1 { "" } else { "s" }
        )),
        SinkCall::ControlsRunning { running: false }
        | SinkCall::VisualIntensity { .. }
        | SinkCall::BreathingAnimation { .. } => None,
    }
}

impl PresentationSink for TerminalSink {
    fn show_text(&mut self, message: &str) {
        self.render(SinkCall::ShowText {
            message: message.to_string(),
        });
    }

    fn set_visual_intensity(&mut self, opacity: f64) {
        self.render(SinkCall::VisualIntensity { opacity });
    }

    fn set_breathing_animation(&mut self, active: bool) {
        self.render(SinkCall::BreathingAnimation { active });
    }

    fn play_cue(&mut self, cue: Cue) {
        self.render(SinkCall::PlayCue { cue });
    }

    fn start_music(&mut self, track: &str) {
        self.render(SinkCall::StartMusic {
            track: track.to_string(),
        });
    }

    fn stop_music(&mut self) {
        self.render(SinkCall::StopMusic);
    }

    fn set_controls_running(&mut self, running: bool) {
        self.render(SinkCall::ControlsRunning { running });
    }

    fn show_streak_count(&mut self, count: u32) {
        if !self.show_streak {
            return;
        }
        self.render(SinkCall::StreakCount { count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_lines() {
        assert_eq!(
            human_line(&SinkCall::ShowText {
                message: "Hold...".into()
            })
            .as_deref(),
            Some("  Hold...")
        );
        assert_eq!(
            human_line(&SinkCall::StreakCount { count: 1 }).as_deref(),
            Some("  Streak: 1 day")
        );
        assert_eq!(
            human_line(&SinkCall::StreakCount { count: 4 }).as_deref(),
            Some("  Streak: 4 days")
        );
        assert!(human_line(&SinkCall::VisualIntensity { opacity: 0.7 }).is_none());
    }
}
