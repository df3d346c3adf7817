//! Playback engine boundary.
//!
//! **Why**: Decoding and rendering belong to the platform media engine. The
//! core only orchestrates it, so everything it needs is expressed as the
//! `PlaybackEngine` and `ThumbnailGenerator` traits plus plain data types.
//!
//! **Used by**: `PlayerCore` (engine), `PlayerController` (thumbnails),
//! `sim` (in-process implementation for the CLI and tests)
//!
//! # Asynchrony
//!
//! Long-running engine work (metadata load, seeks, thumbnails) never returns
//! a result directly. The engine reports back through the `Sink` handed to
//! `connect()`. Every notification carries the ticket or observer token it
//! answers, so the core can drop answers to requests it no longer tracks.

pub mod sim;

use crate::core::ui_context::Sink;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

// ==================== Identifiers ====================

/// Identifies one metadata resolution request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(pub u64);

/// Identifies one seek request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeekTicket(pub u64);

/// Identifies one registered observer (periodic or item-level).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverToken(pub u64);

/// Identity of an engine item. A fresh id is minted per attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==================== Media description ====================

/// Metadata keys resolved before an item can be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetadataKey {
    Tracks,
    Playable,
    Duration,
}

impl MetadataKey {
    /// Keys in the order they are checked.
    pub const ALL: [MetadataKey; 3] = [MetadataKey::Tracks, MetadataKey::Playable, MetadataKey::Duration];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackKind {
    Video,
    Audio,
    Text,
}

/// Preferred display rotation of a video track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackRotation {
    #[default]
    None,
    Quarter,
    Half,
    ThreeQuarter,
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: f32,
    pub height: f32,
}

impl FrameSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub kind: TrackKind,
    /// Encoded size before the preferred transform
    pub natural_size: FrameSize,
    #[serde(default)]
    pub rotation: TrackRotation,
}

impl TrackInfo {
    pub fn video(width: f32, height: f32) -> Self {
        Self {
            kind: TrackKind::Video,
            natural_size: FrameSize::new(width, height),
            rotation: TrackRotation::None,
        }
    }

    pub fn audio() -> Self {
        Self {
            kind: TrackKind::Audio,
            natural_size: FrameSize::default(),
            rotation: TrackRotation::None,
        }
    }

    /// Size after applying the preferred rotation (always non-negative).
    pub fn display_size(&self) -> FrameSize {
        let FrameSize { width, height } = self.natural_size;
        let (w, h) = match self.rotation {
            TrackRotation::None | TrackRotation::Half => (width, height),
            TrackRotation::Quarter | TrackRotation::ThreeQuarter => (height, width),
        };
        FrameSize::new(w.abs(), h.abs())
    }
}

/// Resolved metadata of a media resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Seconds. `None` for indefinite (live) media.
    pub duration: Option<f64>,
    pub tracks: Vec<TrackInfo>,
    pub playable: bool,
}

impl MediaInfo {
    pub fn first_video_track(&self) -> Option<&TrackInfo> {
        self.tracks.iter().find(|t| t.kind == TrackKind::Video)
    }
}

/// Metadata resolution failed for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionFailure {
    pub key: MetadataKey,
    pub reason: String,
}

/// What to attach: an already-resolved item or a locator to resolve.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaSource {
    /// Opaque URL-like string supplied by the embedding application
    Locator(String),
    /// Media whose metadata is already known
    Resolved { locator: String, info: MediaInfo },
}

impl MediaSource {
    pub fn locator(&self) -> &str {
        match self {
            MediaSource::Locator(locator) => locator,
            MediaSource::Resolved { locator, .. } => locator,
        }
    }
}

impl From<&str> for MediaSource {
    fn from(locator: &str) -> Self {
        MediaSource::Locator(locator.to_string())
    }
}

/// The playable unit attached to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineItem {
    pub id: ItemId,
    pub locator: String,
    pub info: MediaInfo,
}

// ==================== Requests ====================

#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub locator: String,
}

/// Allowed distance from the requested time, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekTolerance {
    pub before: f64,
    pub after: f64,
}

impl SeekTolerance {
    /// Frame-exact seek
    pub const ZERO: SeekTolerance = SeekTolerance { before: 0.0, after: 0.0 };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekRequest {
    pub ticket: SeekTicket,
    pub time: f64,
    /// `None` lets the engine pick (fast, keyframe-aligned)
    pub tolerance: Option<SeekTolerance>,
}

/// Engine behaviour when the item plays to its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndAction {
    /// Pause at the end (default)
    #[default]
    Pause,
    /// Keep running (used for looping)
    None,
}

/// Item-level properties and notifications the core observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemObservation {
    LikelyToKeepUp,
    BufferEmpty,
    LoadedTimeRanges,
    DidPlayToEnd,
    FailedToPlayToEnd,
}

impl ItemObservation {
    pub const ALL: [ItemObservation; 5] = [
        ItemObservation::LikelyToKeepUp,
        ItemObservation::BufferEmpty,
        ItemObservation::LoadedTimeRanges,
        ItemObservation::DidPlayToEnd,
        ItemObservation::FailedToPlayToEnd,
    ];
}

/// Half-open time range in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub duration: f64,
}

impl TimeRange {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Payload of an item observer callback.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemNotification {
    LikelyToKeepUp(bool),
    BufferEmpty(bool),
    LoadedTimeRanges(Vec<TimeRange>),
    DidPlayToEnd,
    FailedToPlayToEnd(String),
}

/// Everything the engine reports back.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Loaded {
        ticket: LoadTicket,
        result: Result<MediaInfo, ResolutionFailure>,
    },
    PeriodicTime {
        token: ObserverToken,
        time: f64,
    },
    Item {
        token: ObserverToken,
        item: ItemId,
        notification: ItemNotification,
    },
    SeekFinished {
        ticket: SeekTicket,
        finished: bool,
    },
}

/// Platform media engine.
///
/// Implementations must never call back synchronously into the core; every
/// answer goes through the connected sink.
pub trait PlaybackEngine {
    /// Install the notification sink. Called once by `PlayerCore::new`.
    fn connect(&mut self, sink: Sink<EngineEvent>);

    /// Start resolving `tracks`, `playable` and `duration` for a locator.
    fn load(&mut self, request: LoadRequest);

    /// Abandon a resolution. A late answer may still arrive.
    fn cancel_load(&mut self, ticket: LoadTicket);

    /// Replace the current item (`None` detaches).
    fn replace_item(&mut self, item: Option<EngineItem>);

    fn play(&mut self);

    fn pause(&mut self);

    fn seek(&mut self, request: SeekRequest);

    fn set_action_at_item_end(&mut self, action: EndAction);

    /// Position of the current item, `None` without an item.
    fn current_time(&self) -> Option<f64>;

    fn set_muted(&mut self, muted: bool);

    fn is_muted(&self) -> bool;

    fn set_volume(&mut self, volume: f32);

    fn volume(&self) -> f32;

    fn add_periodic_time_observer(&mut self, interval: Duration) -> ObserverToken;

    fn add_item_observer(&mut self, item: ItemId, observation: ItemObservation) -> ObserverToken;

    fn remove_observer(&mut self, token: ObserverToken);
}

// ==================== Thumbnails ====================

/// Single-frame request. `seq` orders requests from one controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThumbnailRequest {
    pub seq: u64,
    pub time: f64,
    pub max_size: FrameSize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ThumbnailOutcome {
    Succeeded(RgbaImage),
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailResult {
    pub seq: u64,
    pub requested_time: f64,
    pub outcome: ThumbnailOutcome,
}

/// Asynchronous single-frame generator bound to one media source.
pub trait ThumbnailGenerator {
    fn connect(&mut self, sink: Sink<ThumbnailResult>);

    /// Rebind to another media resource. Pending requests are cancelled.
    fn set_source(&mut self, locator: &str);

    fn generate(&mut self, request: ThumbnailRequest);

    /// Cancel everything in flight. Cancelled requests report `Cancelled`.
    fn cancel_all(&mut self);
}
