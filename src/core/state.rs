//! Playback and buffering state enums plus the transition cell they live in.
//!
//! **Why**: Every state write goes through `Tracked::set`, which reports
//! whether the value actually changed. Callers emit change events only on
//! `true`, so duplicate writes never reach listeners.

use serde::{Deserialize, Serialize};
use std::fmt;

/// High-level playback state of a `PlayerCore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
    /// Terminal for the current source. Attach a new source to recover.
    Failed,
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Failed => "failed",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Buffering state of the attached item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BufferingState {
    #[default]
    Unknown,
    ReadyToPlay,
    Buffering,
}

impl BufferingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BufferingState::Unknown => "unknown",
            BufferingState::ReadyToPlay => "readyToPlay",
            BufferingState::Buffering => "buffering",
        }
    }
}

impl fmt::Display for BufferingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value cell with explicit change detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tracked<T> {
    value: T,
}

impl<T: Copy + PartialEq> Tracked<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn get(&self) -> T {
        self.value
    }

    /// Store `value`. Returns `true` only if it differs from the old one.
    pub fn set(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        true
    }
}
