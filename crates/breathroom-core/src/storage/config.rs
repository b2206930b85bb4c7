//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Default session length and music selection
//! - The set of available background tracks
//! - Visual intensity used while breathing
//!
//! Configuration is stored at `~/.config/breathroom/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::data_dir;
use crate::error::{ConfigError, SessionError};
use crate::session::{MusicChoice, SessionConfig};

/// Defaults used when a session is started without explicit options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionDefaults {
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u32,
    /// "none" or one of `music.tracks`.
    #[serde(default = "default_music")]
    pub music: String,
}

/// Background music library.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MusicConfig {
    #[serde(default = "default_tracks")]
    pub tracks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    /// Orb opacity while breathing, 0.0 ..= 1.0.
    #[serde(default = "default_visual_intensity")]
    pub visual_intensity: f64,
    #[serde(default = "default_true")]
    pub show_streak: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/breathroom/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub session: SessionDefaults,
    #[serde(default)]
    pub music: MusicConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

fn default_duration_minutes() -> u32 {
    5
}
fn default_music() -> String {
    "none".into()
}
fn default_tracks() -> Vec<String> {
    vec!["rain".into(), "forest".into()]
}
fn default_visual_intensity() -> f64 {
    0.7
}
fn default_true() -> bool {
    true
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            duration_minutes: default_duration_minutes(),
            music: default_music(),
        }
    }
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            tracks: default_tracks(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            visual_intensity: default_visual_intensity(),
            show_streak: true,
        }
    }
}

impl Config {
    fn lookup<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
        if key.is_empty() {
            return None;
        }
        key.split('.').try_fold(root, |node, part| node.get(part))
    }

    /// Replace the leaf at `key`, parsing `raw` as the type already stored there.
    fn assign(root: &mut Value, key: &str, raw: &str) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let (parent_path, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut parent = root;
        if let Some(path) = parent_path {
            for part in path.split('.') {
                parent = parent.get_mut(part).ok_or_else(unknown)?;
            }
        }
        let slot = parent
            .as_object_mut()
            .and_then(|obj| obj.get_mut(leaf))
            .ok_or_else(unknown)?;

        let updated = match &*slot {
            Value::Bool(_) => Value::Bool(
                raw.parse::<bool>()
                    .map_err(|_| invalid(format!("expected true or false, got '{raw}'")))?,
            ),
            Value::Number(_) => {
                if let Ok(n) = raw.parse::<u64>() {
                    Value::Number(n.into())
                } else {
                    raw.parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                        .map(Value::Number)
                        .ok_or_else(|| invalid(format!("cannot parse '{raw}' as number")))?
                }
            }
            Value::Array(_) | Value::Object(_) => {
                serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?
            }
            _ => Value::String(raw.to_string()),
        };
        *slot = updated;
        Ok(())
    }

    /// Location of `config.toml`, creating the data directory if needed.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing and returning defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    /// Every settable dot-separated key, sorted.
    pub fn keys(&self) -> Vec<String> {
        fn walk(prefix: &str, node: &Value, out: &mut Vec<String>) {
            match node {
                Value::Object(map) => {
                    for (name, child) in map {
                        let key = if prefix.is_empty() {
                            name.clone()
                        } else {
                            format!("{prefix}.{name}")
                        };
                        walk(&key, child, out);
                    }
                }
                _ => out.push(prefix.to_string()),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match Self::lookup(&json, key)? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without persisting it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::assign(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session.duration_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "session.duration_minutes".into(),
                message: "must be at least 1".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.display.visual_intensity) {
            return Err(ConfigError::InvalidValue {
                key: "display.visual_intensity".into(),
                message: "must be between 0.0 and 1.0".into(),
            });
        }
        for (i, track) in self.music.tracks.iter().enumerate() {
            let invalid = |message: &str| ConfigError::InvalidValue {
                key: "music.tracks".into(),
                message: format!("'{track}' {message}"),
            };
            if track.trim().is_empty() || track.trim() != track {
                return Err(invalid("must be a non-empty name without surrounding spaces"));
            }
            if track.eq_ignore_ascii_case("none") {
                return Err(invalid("is reserved for silence"));
            }
            if self.music.tracks[..i]
                .iter()
                .any(|t| t.eq_ignore_ascii_case(track))
            {
                return Err(invalid("is listed twice (names ignore case)"));
            }
        }
        self.music_choice(&self.session.music)
            .map(|_| ())
            .map_err(|e| ConfigError::InvalidValue {
                key: "session.music".into(),
                message: e.to_string(),
            })
    }

    /// Resolve a music selection against the configured track list.
    ///
    /// Track names match ignoring ASCII case; the result carries the
    /// spelling from `music.tracks`.
    pub fn music_choice(&self, raw: &str) -> Result<MusicChoice, SessionError> {
        match raw.parse()? {
            MusicChoice::None => Ok(MusicChoice::None),
            MusicChoice::Track(track) => self
                .music
                .tracks
                .iter()
                .find(|t| t.eq_ignore_ascii_case(&track))
                .map(|t| MusicChoice::Track(t.clone()))
                .ok_or(SessionError::UnknownTrack(track)),
        }
    }

    /// Session configuration from the stored defaults, with optional overrides.
    pub fn session_config(
        &self,
        minutes: Option<u32>,
        music: Option<&str>,
    ) -> Result<SessionConfig, SessionError> {
        let music = self.music_choice(music.unwrap_or(&self.session.music))?;
        SessionConfig::new(minutes.unwrap_or(self.session.duration_minutes), music)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.session.duration_minutes, 5);
        assert_eq!(parsed.music.tracks, vec!["rain", "forest"]);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[session]\nduration_minutes = 12\n").unwrap();
        assert_eq!(parsed.session.duration_minutes, 12);
        assert_eq!(parsed.session.music, "none");
        assert_eq!(parsed.display.visual_intensity, 0.7);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("session.duration_minutes").as_deref(), Some("5"));
        assert_eq!(cfg.get("session.music").as_deref(), Some("none"));
        assert_eq!(cfg.get("display.show_streak").as_deref(), Some("true"));
        assert!(cfg.get("display.missing").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn keys_lists_every_leaf() {
        let keys = Config::default().keys();
        for key in [
            "session.duration_minutes",
            "session.music",
            "music.tracks",
            "display.visual_intensity",
            "display.show_streak",
        ] {
            assert!(keys.iter().any(|k| k == key), "missing {key}");
        }
        assert_eq!(keys.len(), 5);
        assert!(keys.iter().all(|k| Config::default().get(k).is_some()));
    }

    #[test]
    fn set_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.set("session.duration_minutes", "10").unwrap();
        cfg.set("session.music", "forest").unwrap();
        cfg.set("display.show_streak", "false").unwrap();
        cfg.set("music.tracks", r#"["rain","forest","waves"]"#).unwrap();
        assert_eq!(cfg.session.duration_minutes, 10);
        assert_eq!(cfg.session.music, "forest");
        assert!(!cfg.display.show_streak);
        assert_eq!(cfg.music.tracks.len(), 3);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("session.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.set("nope", "1"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_rejects_invalid_values_and_keeps_old_state() {
        let mut cfg = Config::default();
        assert!(cfg.set("display.show_streak", "maybe").is_err());
        assert!(cfg.set("session.duration_minutes", "0").is_err());
        assert!(cfg.set("session.music", "whale-song").is_err());
        assert!(cfg.set("display.visual_intensity", "1.5").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn session_config_uses_defaults_and_overrides() {
        let cfg = Config::default();
        let session = cfg.session_config(None, None).unwrap();
        assert_eq!(session.duration_minutes, 5);
        assert_eq!(session.music, MusicChoice::None);

        let session = cfg.session_config(Some(2), Some("rain")).unwrap();
        assert_eq!(session.duration_minutes, 2);
        assert_eq!(session.music, MusicChoice::Track("rain".into()));

        assert!(cfg.session_config(Some(0), None).is_err());
    }

    #[test]
    fn mixed_case_tracks_are_selectable() {
        let mut cfg = Config::default();
        cfg.set("music.tracks", r#"["rain","forest","Ocean"]"#).unwrap();

        for raw in ["Ocean", "ocean", "OCEAN"] {
            let session = cfg.session_config(None, Some(raw)).unwrap();
            assert_eq!(session.music, MusicChoice::Track("Ocean".into()));
        }
        cfg.set("session.music", "ocean").unwrap();
        assert_eq!(
            cfg.session_config(None, None).unwrap().music,
            MusicChoice::Track("Ocean".into())
        );
        assert!(matches!(
            cfg.session_config(None, Some("Lake")),
            Err(SessionError::UnknownTrack(t)) if t == "Lake"
        ));
    }

    #[test]
    fn hand_edited_mixed_case_music_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[session]\nmusic = \"Ocean\"\n\n[music]\ntracks = [\"rain\", \"Ocean\"]\n",
        )
        .unwrap();
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(
            cfg.session_config(None, None).unwrap().music,
            MusicChoice::Track("Ocean".into())
        );
    }

    #[test]
    fn track_list_rejects_ambiguous_names() {
        let mut cfg = Config::default();
        for tracks in [
            r#"["rain","Rain"]"#,
            r#"["rain","None"]"#,
            r#"["rain",""]"#,
            r#"["rain"," waves"]"#,
        ] {
            assert!(
                matches!(
                    cfg.set("music.tracks", tracks),
                    Err(ConfigError::InvalidValue { ref key, .. }) if key == "music.tracks"
                ),
                "{tracks} should be rejected"
            );
        }
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.set("session.duration_minutes", "20").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().session.duration_minutes, 20);
    }

    #[test]
    fn load_from_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "session = [").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
