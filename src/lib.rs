//! VIDCTL - video player control surface library
//!
//! Re-exports all modules for use by binary targets.

// Core (player state machine, events, UI context, lifecycle)
pub mod core;

// Playback engine boundary and simulated engine
pub mod engine;

// App modules
pub mod app;
pub mod cli;
pub mod config;
pub mod paths;
pub mod utils;
pub mod widgets;

// Re-export commonly used types
pub use app::{ControlsView, PlayerController, ViewEvent};
pub use config::{ControlSettings, PlayerSettings, Settings};
pub use crate::core::event_bus::EventBus;
pub use crate::core::player::PlayerCore;
pub use crate::core::player_events::{PlayerEvent, PlayerMessage, SeekOutcome};
pub use crate::core::state::{BufferingState, PlaybackState};
