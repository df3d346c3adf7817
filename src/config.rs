//! Settings persisted as JSON.
//!
//! **Why**: Lifecycle policy, loop/freeze behaviour and control timings are
//! configuration, not code. Values are checked once by `validate()` so bad
//! settings fail before any player is built.
//!
//! **Used by**: `PlayerCore` (`PlayerSettings`), `PlayerController`
//! (`ControlSettings`), CLI (`Settings::load_or_default`)

use crate::core::error::ConfigError;
use crate::engine::{EndAction, FrameSize};
use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Playback policy of one `PlayerCore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Restart from zero at the end instead of stopping
    pub playback_loops: bool,
    /// Stop in place at the end (otherwise rewind to zero, then stop)
    pub playback_freezes_at_end: bool,
    pub pauses_when_backgrounded: bool,
    pub resumes_when_entering_foreground: bool,
    pub resumes_when_became_active: bool,
    /// Periodic current-time report interval
    pub periodic_interval_ms: u64,
    pub muted: bool,
    pub volume: f32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            playback_loops: false,
            playback_freezes_at_end: true,
            pauses_when_backgrounded: true,
            resumes_when_entering_foreground: true,
            resumes_when_became_active: true,
            periodic_interval_ms: 10,
            muted: false,
            volume: 1.0,
        }
    }
}

impl PlayerSettings {
    pub fn periodic_interval(&self) -> Duration {
        Duration::from_millis(self.periodic_interval_ms)
    }

    /// Engine end-of-item action implied by the loop flag.
    pub fn end_action(&self) -> EndAction {
        if self.playback_loops {
            EndAction::None
        } else {
            EndAction::Pause
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(ConfigError::VolumeOutOfRange(self.volume));
        }
        if self.periodic_interval_ms == 0 {
            return Err(ConfigError::ZeroPeriodicInterval);
        }
        Ok(())
    }
}

/// Control-surface timings and geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    /// Start playback from the beginning as soon as a source is loaded
    pub autoplay: bool,
    pub hide_controls_after_ms: u64,
    pub fade_duration_ms: u64,
    pub preview_width: f32,
    pub preview_height: f32,
    pub preview_left_margin: f32,
    pub preview_right_margin: f32,
    /// Width of the player view hosting the preview
    pub view_width: f32,
    /// Width of the scrub track (thumb included)
    pub track_width: f32,
    pub thumb_width: f32,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            autoplay: true,
            hide_controls_after_ms: 3000,
            fade_duration_ms: 300,
            preview_width: 160.0,
            preview_height: 90.0,
            preview_left_margin: 8.0,
            preview_right_margin: 8.0,
            view_width: 640.0,
            track_width: 496.0,
            thumb_width: 16.0,
        }
    }
}

impl ControlSettings {
    pub fn hide_delay(&self) -> Duration {
        Duration::from_millis(self.hide_controls_after_ms)
    }

    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.fade_duration_ms)
    }

    pub fn preview_size(&self) -> FrameSize {
        FrameSize::new(self.preview_width, self.preview_height)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hide_controls_after_ms == 0 {
            return Err(ConfigError::ZeroHideDelay);
        }
        if self.preview_width <= 0.0 || self.preview_height <= 0.0 {
            return Err(ConfigError::InvalidPreviewSize {
                width: self.preview_width,
                height: self.preview_height,
            });
        }
        let needed = self.preview_width + self.preview_left_margin + self.preview_right_margin;
        if needed > self.view_width {
            return Err(ConfigError::PreviewWiderThanView {
                needed,
                view_width: self.view_width,
            });
        }
        if self.thumb_width >= self.track_width {
            return Err(ConfigError::ThumbWiderThanTrack {
                thumb_width: self.thumb_width,
                track_width: self.track_width,
            });
        }
        Ok(())
    }
}

/// Complete settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub player: PlayerSettings,
    pub controls: ControlSettings,
}

impl Settings {
    /// Load from `path`, falling back to defaults if the file is missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        debug!("Saved settings to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.player.validate()?;
        self.controls.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(Settings::default().validate(), Ok(()));
    }

    #[test]
    fn test_invalid_volume_fails_fast() {
        let mut settings = Settings::default();
        settings.player.volume = 1.5;
        assert_eq!(settings.validate(), Err(ConfigError::VolumeOutOfRange(1.5)));
    }

    #[test]
    fn test_preview_must_fit_view() {
        let mut controls = ControlSettings::default();
        controls.view_width = 100.0;
        assert!(matches!(
            controls.validate(),
            Err(ConfigError::PreviewWiderThanView { .. })
        ));
    }

    #[test]
    fn test_end_action_follows_loop_flag() {
        let mut player = PlayerSettings::default();
        assert_eq!(player.end_action(), EndAction::Pause);
        player.playback_loops = true;
        assert_eq!(player.end_action(), EndAction::None);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vidctl.json");

        let mut settings = Settings::default();
        settings.player.playback_loops = true;
        settings.controls.hide_controls_after_ms = 1500;
        settings.save(&path).unwrap();

        assert_eq!(Settings::load_or_default(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_file_gives_defaults_and_partial_file_fills_in() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert_eq!(Settings::load_or_default(&missing).unwrap(), Settings::default());

        let partial = dir.path().join("partial.json");
        std::fs::write(&partial, r#"{ "player": { "playback_loops": true } }"#).unwrap();
        let loaded = Settings::load_or_default(&partial).unwrap();
        assert!(loaded.player.playback_loops);
        assert!(loaded.player.playback_freezes_at_end);
        assert_eq!(loaded.controls, ControlSettings::default());
    }
}
