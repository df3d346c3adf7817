//! Application module - PlayerController and its view model.
//!
//! This module organizes the control-surface logic into focused submodules:
//! - `events` - Handlers for player events, scrub events, thumbnails and timers
//! - `view` - `ControlsView`, `ViewEvent` and the UI-context message type
//!
//! `PlayerController` owns a `PlayerCore`, the scrub slider, the thumbnail
//! generator and the auto-hide timer. All collaborator callbacks funnel into
//! one `UiContext<UiMessage>`; `pump(now)` drains it on the owning thread and
//! runs the handlers.

mod events;
mod view;

pub use view::{ControlsView, SurfaceEvent, UiMessage, ViewEvent};

use crate::config::{ControlSettings, Settings};
use crate::core::controls_timer::ControlsTimer;
use crate::core::error::ConfigError;
use crate::core::event_bus::EventBus;
use crate::core::lifecycle::LifecycleHub;
use crate::core::player::PlayerCore;
use crate::core::state::PlaybackState;
use crate::core::ui_context::{Sink, UiContext, UiHandle};
use crate::engine::{MediaSource, PlaybackEngine, SeekTicket, ThumbnailGenerator};
use crate::widgets::{PreviewGeometry, PreviewState, Slider};
use log::{debug, info};
use std::time::Instant;

/// Seek issued at the end of a scrub, awaiting completion.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ScrubSeek {
    ticket: SeekTicket,
    /// Playback state before the first scrub of a run
    previous: PlaybackState,
}

/// Control surface bound to one player.
pub struct PlayerController<E: PlaybackEngine, T: ThumbnailGenerator> {
    ctx: UiContext<UiMessage>,
    player: PlayerCore<E>,
    thumbnails: T,
    settings: ControlSettings,
    slider: Slider,
    geometry: PreviewGeometry,
    view: ControlsView,
    events: EventBus<ViewEvent>,
    hide_timer: ControlsTimer,
    /// Sequence number of the latest thumbnail request
    thumbnail_seq: u64,
    scrub_seek: Option<ScrubSeek>,
    ready_for_display: bool,
}

impl<E: PlaybackEngine, T: ThumbnailGenerator> PlayerController<E, T> {
    /// Build the controller. Fails on invalid settings.
    pub fn new(engine: E, mut thumbnails: T, settings: &Settings, lifecycle: &LifecycleHub) -> Result<Self, ConfigError> {
        settings.validate()?;

        let ctx = UiContext::new();
        let player = PlayerCore::new(engine, settings.player.clone(), lifecycle, ctx.sink(UiMessage::Player));
        thumbnails.connect(ctx.sink(UiMessage::Thumbnail));

        let controls = settings.controls.clone();
        let geometry = PreviewGeometry {
            view_width: controls.view_width,
            preview_width: controls.preview_width,
            left_margin: controls.preview_left_margin,
            right_margin: controls.preview_right_margin,
        };
        let view = ControlsView::new(PreviewState::new(controls.preview_size()));
        debug!("PlayerController created (hide after {}ms)", controls.hide_controls_after_ms);

        Ok(Self {
            ctx,
            player,
            thumbnails,
            slider: Slider::new(controls.track_width, controls.thumb_width),
            geometry,
            view,
            events: EventBus::new(),
            hide_timer: ControlsTimer::new(controls.hide_delay()),
            thumbnail_seq: 0,
            scrub_seek: None,
            ready_for_display: false,
            settings: controls,
        })
    }

    // ==================== Accessors ====================

    pub fn player(&self) -> &PlayerCore<E> {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut PlayerCore<E> {
        &mut self.player
    }

    pub fn thumbnails(&self) -> &T {
        &self.thumbnails
    }

    pub fn thumbnails_mut(&mut self) -> &mut T {
        &mut self.thumbnails
    }

    pub fn view(&self) -> &ControlsView {
        &self.view
    }

    pub fn slider(&self) -> &Slider {
        &self.slider
    }

    pub fn settings(&self) -> &ControlSettings {
        &self.settings
    }

    pub fn is_ready_for_display(&self) -> bool {
        self.ready_for_display
    }

    pub fn events(&self) -> &EventBus<ViewEvent> {
        &self.events
    }

    /// Take queued view events, oldest first.
    pub fn poll_view_events(&self) -> Vec<ViewEvent> {
        self.events.poll()
    }

    /// Handle for posting onto this controller's UI context.
    pub fn ui_handle(&self) -> UiHandle<UiMessage> {
        self.ctx.handle()
    }

    /// Sink for the render surface's readiness report.
    pub fn surface_sink(&self) -> Sink<SurfaceEvent> {
        self.ctx.sink(UiMessage::Surface)
    }

    // ==================== Commands ====================

    /// Load a new source: rebind thumbnails, attach, apply autoplay.
    ///
    /// Controls start hidden with the spinner showing until buffering settles.
    pub fn load(&mut self, source: MediaSource) {
        info!("Loading {}", source.locator());
        self.thumbnails.set_source(source.locator());
        // Anything still in flight belongs to the previous source
        self.thumbnail_seq += 1;
        self.scrub_seek = None;
        self.view.error = None;
        self.view.preview.image = None;

        self.player.attach_source(source);
        if self.settings.autoplay {
            self.player.play_from_beginning();
        }
        self.view.is_playing = self.settings.autoplay;
        self.view.spinner_visible = true;
        self.set_controls_visible(false);
    }

    /// Tap on the player view: flip control visibility.
    pub fn toggle_controls(&mut self, now: Instant) {
        self.hide_timer.schedule(now);
        let visible = !self.view.controls_visible;
        self.set_controls_visible(visible);
    }

    /// Play/pause toggle pressed.
    pub fn press_play_button(&mut self, now: Instant) {
        if self.view.is_playing {
            self.player.pause();
        } else {
            self.player.play_from_current_time();
        }
        self.hide_timer.schedule(now);
    }

    /// Drain the UI context and process everything pending, then fire the
    /// hide timer if due.
    pub fn pump(&mut self, now: Instant) {
        loop {
            let events = self.player.poll_events();
            let messages = self.ctx.drain();
            if events.is_empty() && messages.is_empty() {
                break;
            }
            for event in events {
                self.on_player_event(event, now);
            }
            for msg in messages {
                match msg {
                    UiMessage::Player(msg) => self.player.handle(msg),
                    UiMessage::Thumbnail(result) => self.on_thumbnail(result),
                    UiMessage::Surface(event) => self.on_surface(event),
                }
            }
        }
        if self.hide_timer.tick(now) {
            self.on_hide_timer();
        }
    }

    /// Tear down the player and stop all pending work. Idempotent.
    pub fn teardown(&mut self) {
        self.player.teardown();
        self.thumbnails.cancel_all();
        self.hide_timer.cancel();
        self.scrub_seek = None;
    }

    fn set_controls_visible(&mut self, visible: bool) {
        if self.view.controls_visible == visible {
            return;
        }
        self.view.controls_visible = visible;
        self.events.emit(ViewEvent::ControlsVisibilityChanged {
            visible,
            fade: self.settings.fade_duration(),
        });
    }

    fn set_preview_visible(&mut self, visible: bool) {
        if self.view.preview.visible == visible {
            return;
        }
        self.view.preview.visible = visible;
        self.events.emit(ViewEvent::PreviewVisibilityChanged {
            visible,
            fade: self.settings.fade_duration(),
        });
    }
}
