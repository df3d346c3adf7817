//! Slider gesture input and scrub events.

/// Raw pan gesture reported by the hosting view. `x` is the touch location
/// relative to the slider's left edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PanGesture {
    Began { x: f32 },
    Changed { x: f32 },
    Ended { x: f32 },
    Cancelled { x: f32 },
}

/// Scrub notification for the orchestrator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SliderEvent {
    PanBegan,
    /// Emitted on every move
    Panned { thumb_value: f32 },
    /// Final normalized value, already stored as `value`
    PanEnded { value: f32 },
}
