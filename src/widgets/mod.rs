//! UI Widgets - control-surface models
//!
//! Each widget is self-contained; the controller feeds it input and reads
//! back geometry for the renderer.

pub mod preview;
pub mod slider;

pub use preview::{PreviewGeometry, PreviewImage, PreviewState};
pub use slider::{PanGesture, PanState, Slider, SliderEvent, SliderLayout};
