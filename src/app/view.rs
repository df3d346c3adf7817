//! View model handed to the rendering collaborator.

use crate::core::player_events::PlayerMessage;
use crate::engine::ThumbnailResult;
use crate::widgets::PreviewState;
use serde::Serialize;
use std::time::Duration;

/// Report from the render surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The surface has its first frame on screen
    ReadyForDisplay,
}

/// Everything the controller's UI context carries.
#[derive(Clone, Debug, PartialEq)]
pub enum UiMessage {
    Player(PlayerMessage),
    Thumbnail(ThumbnailResult),
    Surface(SurfaceEvent),
}

/// Notifications for the renderer that are not plain state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewEvent {
    /// First frame displayed. Fires once per controller.
    ReadyForDisplay,
    ControlsVisibilityChanged { visible: bool, fade: Duration },
    PreviewVisibilityChanged { visible: bool, fade: Duration },
}

/// Control overlay state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ControlsView {
    /// Play toggle shows "pause" when true
    pub is_playing: bool,
    pub play_button_hidden: bool,
    pub spinner_visible: bool,
    pub controls_visible: bool,
    pub duration_label: String,
    pub current_time_label: String,
    /// Last failure, cleared on the next load
    pub error: Option<String>,
    #[serde(skip)]
    pub preview: PreviewState,
}

impl ControlsView {
    pub fn new(preview: PreviewState) -> Self {
        Self {
            is_playing: false,
            play_button_hidden: false,
            spinner_visible: false,
            controls_visible: true,
            duration_label: "00:00".to_string(),
            current_time_label: "00:00".to_string(),
            error: None,
            preview,
        }
    }
}
