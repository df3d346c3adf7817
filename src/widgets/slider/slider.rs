//! Slider state and geometry.
//!
//! Three fractions drive the rendering: `value` (played), `available_value`
//! (buffered) and `thumb_value` (knob). All are clamped against
//! `[minimum, maximum]` and normalized by `maximum - minimum` (floored at
//! `MIN_RANGE`). While a pan is in progress the gesture owns `thumb_value`;
//! otherwise it follows `value`.

use super::slider_events::{PanGesture, SliderEvent};
use log::trace;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Denominator floor for normalization
const MIN_RANGE: f32 = 1e-5;

/// Pan sub-state. `none -> begin -> pan -> end -> none`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PanState {
    #[default]
    None,
    Begin,
    Pan,
    End,
}

/// Pixel geometry for the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SliderLayout {
    /// Width of the played part of the track
    pub played_width: f32,
    /// Width of the buffered part of the track
    pub available_width: f32,
    /// Left edge of the thumb
    pub thumb_offset: f32,
    /// Animation length for the last programmatic change (zero = immediate)
    #[serde(skip)]
    pub transition: Duration,
}

#[derive(Clone, Debug)]
pub struct Slider {
    value: f32,
    available_value: f32,
    minimum: f32,
    maximum: f32,
    thumb_value: f32,
    pan_state: PanState,
    track_width: f32,
    thumb_width: f32,
    layout: SliderLayout,
}

impl Slider {
    pub fn new(track_width: f32, thumb_width: f32) -> Self {
        let mut slider = Self {
            value: 0.0,
            available_value: 0.0,
            minimum: 0.0,
            maximum: 1.0,
            thumb_value: 0.0,
            pan_state: PanState::None,
            track_width,
            thumb_width,
            layout: SliderLayout::default(),
        };
        slider.update_layout();
        slider
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn available_value(&self) -> f32 {
        self.available_value
    }

    pub fn thumb_value(&self) -> f32 {
        self.thumb_value
    }

    pub fn pan_state(&self) -> PanState {
        self.pan_state
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.pan_state, PanState::Begin | PanState::Pan)
    }

    pub fn range(&self) -> (f32, f32) {
        (self.minimum, self.maximum)
    }

    pub fn layout(&self) -> SliderLayout {
        self.layout
    }

    /// Set the played fraction. `transition` of zero applies immediately.
    pub fn set_value(&mut self, value: f32, transition: Duration) {
        self.value = value;
        self.layout.transition = transition;
        self.update_layout();
    }

    /// Set the buffered fraction. `transition` of zero applies immediately.
    pub fn set_available_value(&mut self, value: f32, transition: Duration) {
        self.available_value = value;
        self.layout.transition = transition;
        self.update_layout();
    }

    pub fn set_range(&mut self, minimum: f32, maximum: f32) {
        self.minimum = minimum;
        self.maximum = maximum;
        self.update_layout();
    }

    /// Resize the track (thumb included).
    pub fn set_track_width(&mut self, track_width: f32) {
        self.track_width = track_width;
        self.update_layout();
    }

    /// Feed one pan gesture sample. Returns the scrub event it produces.
    pub fn handle_pan(&mut self, gesture: PanGesture) -> Option<SliderEvent> {
        match gesture {
            PanGesture::Began { .. } => {
                self.pan_state = PanState::Begin;
                trace!("Slider: pan began");
                Some(SliderEvent::PanBegan)
            }
            PanGesture::Changed { x } => {
                self.move_thumb(x);
                self.pan_state = PanState::Pan;
                Some(SliderEvent::Panned {
                    thumb_value: self.thumb_value,
                })
            }
            PanGesture::Ended { x } | PanGesture::Cancelled { x } => {
                let fraction = self.move_thumb(x);
                self.pan_state = PanState::End;
                self.value = self.minimum + (self.maximum - self.minimum) * fraction;
                self.layout.transition = Duration::ZERO;
                self.update_layout();
                trace!("Slider: pan ended at {:.4}", self.value);
                self.pan_state = PanState::None;
                Some(SliderEvent::PanEnded { value: self.value })
            }
        }
    }

    /// Travel distance of the thumb's left edge.
    fn travel(&self) -> f32 {
        (self.track_width - self.thumb_width).max(0.0)
    }

    /// Clamp `x` to the track, place the thumb there and return its fraction.
    fn move_thumb(&mut self, x: f32) -> f32 {
        let travel = self.travel();
        let target_x = x.clamp(0.0, travel);
        let fraction = target_x / travel.max(MIN_RANGE);
        self.thumb_value = fraction;
        self.layout.thumb_offset = target_x;
        self.layout.transition = Duration::ZERO;
        fraction
    }

    fn update_layout(&mut self) {
        let range = (self.maximum - self.minimum).max(MIN_RANGE);
        let available = (self.available_value - self.minimum).clamp(0.0, range);
        let value = (self.value - self.minimum).clamp(0.0, range);

        self.layout.available_width = self.track_width * (available / range);
        self.layout.played_width = self.track_width * (value / range);

        if !self.is_panning() {
            self.thumb_value = value / range;
            self.layout.thumb_offset = self.travel() * self.thumb_value;
        }
    }
}
