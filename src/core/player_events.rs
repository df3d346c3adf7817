//! Player events and inbound messages.

use crate::core::error::PlayerError;
use crate::core::lifecycle::LifecycleEvent;
use crate::core::state::{BufferingState, PlaybackState};
use crate::engine::{EngineEvent, SeekTicket};

// === Outbound (PlayerCore -> listeners) ===

#[derive(Clone, Debug, PartialEq)]
pub enum PlayerEvent {
    StateChanged(PlaybackState),
    BufferingChanged(BufferingState),
    /// End of the first loaded range, seconds
    BufferTimeChanged(f64),
    /// Periodic position report, seconds
    CurrentTimeChanged(f64),
    WillRestart,
    DidEnd,
    WillLoop,
    /// New item attached; duration `None` when indefinite
    SourceReady { duration: Option<f64> },
    /// Follows `StateChanged(Failed)`
    Failed(PlayerError),
    /// A deferred seek was issued right after attach
    DeferredSeekIssued { ticket: SeekTicket, time: f64 },
    /// Completion of a seek issued through `PlayerCore::seek`
    SeekFinished { ticket: SeekTicket, finished: bool },
}

// === Inbound (collaborators -> PlayerCore, via the UI context) ===

#[derive(Clone, Debug, PartialEq)]
pub enum PlayerMessage {
    Engine(EngineEvent),
    Lifecycle(LifecycleEvent),
}

/// Result of `PlayerCore::seek`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SeekOutcome {
    /// No item yet: recorded as the pending seek
    Deferred,
    /// Sent to the engine. Watch for `SeekFinished` with this ticket
    Issued(SeekTicket),
}
