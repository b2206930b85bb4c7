use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::timer::SessionPlan;

/// Background music for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MusicChoice {
    #[default]
    None,
    /// Identifier of a track in the music library (e.g. "rain").
    Track(String),
}

impl MusicChoice {
    pub fn track(&self) -> Option<&str> {
        match self {
            MusicChoice::None => None,
            MusicChoice::Track(t) => Some(t),
        }
    }
}

impl FromStr for MusicChoice {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SessionError::UnknownTrack(String::new()));
        }
        if s.eq_ignore_ascii_case("none") {
            Ok(MusicChoice::None)
        } else {
            Ok(MusicChoice::Track(s.to_string()))
        }
    }
}

impl fmt::Display for MusicChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MusicChoice::None => f.write_str("none"),
            MusicChoice::Track(t) => f.write_str(t),
        }
    }
}

/// Inputs fixed when a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub duration_minutes: u32,
    pub music: MusicChoice,
}

impl SessionConfig {
    /// # Errors
    /// Rejects a zero-minute duration.
    pub fn new(duration_minutes: u32, music: MusicChoice) -> Result<Self, SessionError> {
        if duration_minutes == 0 {
            return Err(SessionError::InvalidDuration {
                input: duration_minutes.to_string(),
            });
        }
        Ok(Self {
            duration_minutes,
            music,
        })
    }

    /// Check the config again; fields are public and may have been edited.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.duration_minutes == 0 {
            return Err(SessionError::InvalidDuration {
                input: "0".into(),
            });
        }
        Ok(())
    }

    pub fn plan(&self) -> SessionPlan {
        SessionPlan::for_minutes(self.duration_minutes)
    }
}

/// Parse a user-entered duration in whole minutes.
pub fn parse_duration_minutes(input: &str) -> Result<u32, SessionError> {
    let invalid = || SessionError::InvalidDuration {
        input: input.to_string(),
    };
    match input.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(invalid()),
        Ok(n) => Ok(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration_minutes("5"), Ok(5));
        assert_eq!(parse_duration_minutes(" 12 "), Ok(12));
        for bad in ["0", "-3", "abc", "", "2.5"] {
            assert!(
                matches!(parse_duration_minutes(bad), Err(SessionError::InvalidDuration { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn music_choice_from_str() {
        assert_eq!("none".parse::<MusicChoice>(), Ok(MusicChoice::None));
        assert_eq!("NONE".parse::<MusicChoice>(), Ok(MusicChoice::None));
        assert_eq!(
            " Rain ".parse::<MusicChoice>(),
            Ok(MusicChoice::Track("Rain".into()))
        );
        assert!("  ".parse::<MusicChoice>().is_err());
        assert_eq!(MusicChoice::Track("forest".into()).to_string(), "forest");
    }

    #[test]
    fn zero_minutes_rejected() {
        assert!(SessionConfig::new(0, MusicChoice::None).is_err());
        let cfg = SessionConfig::new(5, MusicChoice::None).unwrap();
        assert_eq!(cfg.plan().total_cycles, 16);
    }
}
