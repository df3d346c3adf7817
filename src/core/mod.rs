//! Core modules - player state machine, events, UI context, lifecycle
//!
//! These modules form the playback core, independent of any widget.

pub mod controls_timer;
pub mod error;
pub mod event_bus;
pub mod lifecycle;
pub mod player;
pub mod player_events;
pub mod state;
pub mod ui_context;

// Re-exports for convenience
pub use controls_timer::ControlsTimer;
pub use error::{ConfigError, PlayerError};
pub use event_bus::EventBus;
pub use lifecycle::{LifecycleEvent, LifecycleHub, LifecycleSubscription};
pub use player::PlayerCore;
pub use player_events::{PlayerEvent, PlayerMessage, SeekOutcome};
pub use state::{BufferingState, PlaybackState, Tracked};
pub use ui_context::{Sink, UiContext, UiHandle};
