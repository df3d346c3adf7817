use crate::engine::MetadataKey;

/// Failures reported through the player event channel.
///
/// None of these are returned synchronously from `PlayerCore` methods; they
/// arrive as `PlayerEvent::Failed` after the state moves to `Failed`.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    /// Loading metadata for a tracked key failed
    #[error("Failed to resolve {locator}: {key:?} could not be loaded ({reason})")]
    ResolutionFailure {
        locator: String,
        key: MetadataKey,
        reason: String,
    },

    /// Metadata loaded but the media is not playable
    #[error("Source {locator} is not playable")]
    UnplayableSource { locator: String },

    /// The attached item failed while playing
    #[error("Engine failed to play {locator}: {reason}")]
    EngineFailure { locator: String, reason: String },
}

/// Invalid settings, rejected before anything is wired up.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Volume {0} outside 0.0..=1.0")]
    VolumeOutOfRange(f32),

    #[error("Periodic time interval must be non-zero")]
    ZeroPeriodicInterval,

    #[error("Controls hide delay must be non-zero")]
    ZeroHideDelay,

    #[error("Preview size {width}x{height} must be positive")]
    InvalidPreviewSize { width: f32, height: f32 },

    #[error("Preview ({needed}px incl. margins) does not fit in view width {view_width}px")]
    PreviewWiderThanView { needed: f32, view_width: f32 },

    #[error("Thumb width {thumb_width} must be smaller than track width {track_width}")]
    ThumbWiderThanTrack { thumb_width: f32, track_width: f32 },
}
