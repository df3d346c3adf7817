//! Scrub slider - played, buffered and thumb positions plus drag handling
//!
//! Pure model: the hosting view feeds it pan gestures and renders `layout()`.

mod slider;
mod slider_events;

pub use slider::{PanState, Slider, SliderLayout};
pub use slider_events::{PanGesture, SliderEvent};
