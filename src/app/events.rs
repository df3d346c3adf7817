//! Event handling for PlayerController.
//!
//! Contains handlers for:
//! - Player events (state, buffering, buffer time, current time, seeks)
//! - Scrub gestures (begin / update / end) and thumbnail results
//! - Surface readiness and the auto-hide timer

use super::{PlayerController, ScrubSeek, SurfaceEvent, ViewEvent};
use crate::core::player_events::{PlayerEvent, SeekOutcome};
use crate::core::state::{BufferingState, PlaybackState};
use crate::engine::{PlaybackEngine, SeekTolerance, ThumbnailGenerator, ThumbnailOutcome, ThumbnailRequest, ThumbnailResult};
use crate::utils::time_length;
use crate::widgets::preview::PLACEHOLDER_COLOR;
use crate::widgets::{PanGesture, PanState, PreviewImage, SliderEvent};
use log::{debug, trace, warn};
use std::time::{Duration, Instant};

impl<E: PlaybackEngine, T: ThumbnailGenerator> PlayerController<E, T> {
    // ==================== Player ====================

    pub(super) fn on_player_event(&mut self, event: PlayerEvent, now: Instant) {
        match event {
            PlayerEvent::StateChanged(state) => {
                self.view.is_playing = state == PlaybackState::Playing;
            }
            PlayerEvent::BufferingChanged(BufferingState::Buffering) => {
                self.view.play_button_hidden = true;
                self.view.spinner_visible = true;
            }
            PlayerEvent::BufferingChanged(BufferingState::ReadyToPlay) => {
                self.view.play_button_hidden = false;
                self.view.spinner_visible = false;
            }
            PlayerEvent::BufferingChanged(BufferingState::Unknown) => {}
            PlayerEvent::BufferTimeChanged(buffered) => {
                if let Some(duration) = self.player.duration().filter(|d| *d > 0.0) {
                    self.slider.set_available_value((buffered / duration) as f32, Duration::ZERO);
                }
            }
            PlayerEvent::CurrentTimeChanged(time) => {
                self.view.current_time_label = time_length(time);
                if let Some(duration) = self.player.duration().filter(|d| *d > 0.0) {
                    self.view.duration_label = time_length(duration);
                    self.slider.set_value((time / duration) as f32, Duration::ZERO);
                }
            }
            PlayerEvent::SourceReady { duration } => {
                if let Some(duration) = duration {
                    self.view.duration_label = time_length(duration);
                }
            }
            PlayerEvent::Failed(error) => {
                warn!("Playback failed: {}", error);
                self.view.spinner_visible = false;
                self.view.play_button_hidden = false;
                self.view.error = Some(error.to_string());
            }
            PlayerEvent::SeekFinished { ticket, finished } => {
                match self.scrub_seek {
                    Some(scrub) if scrub.ticket == ticket => {
                        self.scrub_seek = None;
                        debug!("Scrub seek landed (finished={})", finished);
                        self.finish_scrub(scrub.previous, now);
                    }
                    _ => trace!("Seek {:?} finished={}", ticket, finished),
                }
            }
            PlayerEvent::WillRestart | PlayerEvent::WillLoop | PlayerEvent::DidEnd => {
                trace!("Player {:?}", event);
            }
            PlayerEvent::DeferredSeekIssued { ticket, time } => {
                trace!("Deferred seek {:?} to {:.3}", ticket, time);
            }
        }
    }

    // ==================== Scrubbing ====================

    /// Feed one pan gesture sample from the slider.
    pub fn pan(&mut self, gesture: PanGesture, now: Instant) {
        let Some(event) = self.slider.handle_pan(gesture) else {
            return;
        };
        match event {
            SliderEvent::PanBegan => self.on_scrub_begin(now),
            SliderEvent::Panned { thumb_value } => self.on_scrub_update(thumb_value),
            SliderEvent::PanEnded { value } => self.on_scrub_end(value, now),
        }
    }

    fn on_scrub_begin(&mut self, now: Instant) {
        self.hide_timer.schedule(now);
        self.view.preview.offset_x = self.geometry.offset_x(self.slider.thumb_value());
        self.set_preview_visible(true);
    }

    fn on_scrub_update(&mut self, thumb_value: f32) {
        let Some(duration) = self.player.duration() else {
            return;
        };
        let seconds = f64::from(thumb_value) * duration;
        if seconds <= 0.0 {
            return;
        }
        self.view.preview.offset_x = self.geometry.offset_x(thumb_value);
        self.view.preview.time_label = time_length(seconds);

        self.thumbnails.cancel_all();
        self.thumbnail_seq += 1;
        trace!("Thumbnail #{} at {:.2}s", self.thumbnail_seq, seconds);
        self.thumbnails.generate(ThumbnailRequest {
            seq: self.thumbnail_seq,
            time: seconds,
            max_size: self.settings.preview_size(),
        });
    }

    fn on_scrub_end(&mut self, value: f32, now: Instant) {
        self.set_preview_visible(false);
        let Some(duration) = self.player.duration() else {
            debug!("Scrub ended without a known duration, no seek");
            return;
        };
        let seconds = f64::from(value) * duration;

        // A scrub landing on top of an unfinished one keeps the original state
        let previous = self
            .scrub_seek
            .take()
            .map(|scrub| scrub.previous)
            .unwrap_or_else(|| self.player.playback_state());

        self.view.play_button_hidden = true;
        self.view.spinner_visible = true;
        self.player.pause();
        match self.player.seek(seconds, Some(SeekTolerance::ZERO)) {
            SeekOutcome::Issued(ticket) => {
                debug!("Scrub seek to {:.3}s ({:?}, was {})", seconds, ticket, previous);
                self.scrub_seek = Some(ScrubSeek { ticket, previous });
            }
            SeekOutcome::Deferred => self.finish_scrub(previous, now),
        }
    }

    fn finish_scrub(&mut self, previous: PlaybackState, now: Instant) {
        self.view.play_button_hidden = false;
        self.view.spinner_visible = false;
        if previous == PlaybackState::Playing {
            self.player.play_from_current_time();
            self.hide_timer.schedule(now);
        }
    }

    pub(super) fn on_thumbnail(&mut self, result: ThumbnailResult) {
        if result.seq != self.thumbnail_seq {
            trace!("Superseded thumbnail #{} dropped", result.seq);
            return;
        }
        let image = match result.outcome {
            ThumbnailOutcome::Succeeded(frame) => PreviewImage::Frame(frame),
            ThumbnailOutcome::Failed(reason) => {
                debug!("Thumbnail at {:.2}s failed: {}", result.requested_time, reason);
                PreviewImage::Placeholder(PLACEHOLDER_COLOR)
            }
            ThumbnailOutcome::Cancelled => PreviewImage::Placeholder(PLACEHOLDER_COLOR),
        };
        self.view.preview.image = Some(image);
    }

    // ==================== Surface / timer ====================

    pub(super) fn on_surface(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::ReadyForDisplay => {
                if !self.ready_for_display {
                    self.ready_for_display = true;
                    debug!("Surface ready for display");
                    self.events.emit(ViewEvent::ReadyForDisplay);
                }
            }
        }
    }

    pub(super) fn on_hide_timer(&mut self) {
        if self.slider.pan_state() == PanState::Pan {
            return;
        }
        let state = self.player.playback_state();
        if !self.view.controls_visible && matches!(state, PlaybackState::Paused | PlaybackState::Stopped) {
            return;
        }
        self.set_controls_visible(state != PlaybackState::Playing);
    }
}
