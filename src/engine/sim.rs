//! In-process simulated media engine with a virtual clock.
//!
//! **Why**: Drives the CLI headlessly and gives tests full control over the
//! asynchronous side of the engine boundary: loads, seeks and thumbnails can
//! complete automatically or be released by hand, and every call the core
//! makes is recorded.
//!
//! # Model
//!
//! - Buffer grows by `buffer_rate` media-seconds per clock second
//! - Playback advances only while playing AND likely to keep up
//! - Catching up with the buffer edge reports `BufferEmpty(true)` (stall)
//! - Reaching the end reports `DidPlayToEnd` once per arrival
//! - A newer seek supersedes pending ones (they finish with `false`)

use super::*;
use image::Rgba;
use log::{debug, trace};
use std::collections::{BTreeMap, HashMap};

/// Media known to the simulated engine.
#[derive(Debug, Clone)]
pub struct SimMedia {
    pub result: Result<MediaInfo, ResolutionFailure>,
    /// Media-seconds buffered per clock second
    pub buffer_rate: f64,
}

impl SimMedia {
    /// Playable media with one 1280x720 video track.
    pub fn playable(duration: f64) -> Self {
        Self {
            result: Ok(MediaInfo {
                duration: Some(duration),
                tracks: vec![TrackInfo::video(1280.0, 720.0), TrackInfo::audio()],
                playable: true,
            }),
            buffer_rate: 8.0,
        }
    }

    /// Loads fine but reports `playable = false`.
    pub fn unplayable(duration: f64) -> Self {
        let mut media = Self::playable(duration);
        if let Ok(info) = media.result.as_mut() {
            info.playable = false;
        }
        media
    }

    /// Metadata load fails on `key`.
    pub fn broken(key: MetadataKey, reason: &str) -> Self {
        Self {
            result: Err(ResolutionFailure {
                key,
                reason: reason.to_string(),
            }),
            buffer_rate: 0.0,
        }
    }

    pub fn with_buffer_rate(mut self, rate: f64) -> Self {
        self.buffer_rate = rate;
        self
    }
}

/// Calls recorded by `SimEngine`.
#[derive(Debug, Clone, PartialEq)]
pub enum SimCall {
    Load(String),
    CancelLoad(LoadTicket),
    ReplaceItem(Option<ItemId>),
    Play,
    Pause,
    Seek { time: f64, tolerance: Option<SeekTolerance> },
    SetEndAction(EndAction),
    AddPeriodicObserver(Duration),
    AddItemObserver(ItemObservation),
    RemoveObserver(ObserverToken),
}

#[derive(Debug, Clone)]
enum SimObserver {
    Periodic { interval: f64, elapsed: f64 },
    Item { item: ItemId, observation: ItemObservation },
}

/// Simulated `PlaybackEngine`.
pub struct SimEngine {
    sink: Option<Sink<EngineEvent>>,
    catalog: HashMap<String, SimMedia>,
    pending_loads: Vec<LoadRequest>,
    pending_seeks: Vec<SeekRequest>,
    auto_complete_loads: bool,
    auto_complete_seeks: bool,
    item: Option<EngineItem>,
    buffer_rate: f64,
    position: f64,
    buffered: f64,
    playing: bool,
    likely_to_keep_up: bool,
    at_end: bool,
    end_action: EndAction,
    muted: bool,
    volume: f32,
    observers: BTreeMap<ObserverToken, SimObserver>,
    next_token: u64,
    calls: Vec<SimCall>,
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEngine {
    /// Engine with manual completion of loads and seeks (test mode).
    pub fn new() -> Self {
        Self {
            sink: None,
            catalog: HashMap::new(),
            pending_loads: Vec::new(),
            pending_seeks: Vec::new(),
            auto_complete_loads: false,
            auto_complete_seeks: false,
            item: None,
            buffer_rate: 0.0,
            position: 0.0,
            buffered: 0.0,
            playing: false,
            likely_to_keep_up: false,
            at_end: false,
            end_action: EndAction::Pause,
            muted: false,
            volume: 1.0,
            observers: BTreeMap::new(),
            next_token: 0,
            calls: Vec::new(),
        }
    }

    /// Engine that answers loads and seeks on its own (CLI mode).
    pub fn automatic() -> Self {
        Self {
            auto_complete_loads: true,
            auto_complete_seeks: true,
            ..Self::new()
        }
    }

    pub fn register(&mut self, locator: &str, media: SimMedia) {
        self.catalog.insert(locator.to_string(), media);
    }

    // ==================== Inspection ====================

    pub fn calls(&self) -> &[SimCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Seeks recorded since the last `clear_calls`.
    pub fn seek_calls(&self) -> Vec<(f64, Option<SeekTolerance>)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SimCall::Seek { time, tolerance } => Some((*time, *tolerance)),
                _ => None,
            })
            .collect()
    }

    pub fn item(&self) -> Option<&EngineItem> {
        self.item.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn end_action(&self) -> EndAction {
        self.end_action
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn pending_load_count(&self) -> usize {
        self.pending_loads.len()
    }

    pub fn pending_seek_count(&self) -> usize {
        self.pending_seeks.len()
    }

    // ==================== Manual completion ====================

    /// Answer every pending load from the catalog.
    pub fn complete_loads(&mut self) {
        for request in std::mem::take(&mut self.pending_loads) {
            self.answer_load(request);
        }
    }

    /// Finish every pending seek. `finished = false` simulates rejection.
    pub fn complete_seeks(&mut self, finished: bool) {
        for request in std::mem::take(&mut self.pending_seeks) {
            self.finish_seek(request, finished);
        }
    }

    // ==================== Manual notifications ====================

    pub fn set_likely_to_keep_up(&mut self, likely: bool) {
        self.likely_to_keep_up = likely;
        self.notify(ItemObservation::LikelyToKeepUp, ItemNotification::LikelyToKeepUp(likely));
    }

    pub fn set_buffer_empty(&mut self, empty: bool) {
        if empty {
            self.likely_to_keep_up = false;
        }
        self.notify(ItemObservation::BufferEmpty, ItemNotification::BufferEmpty(empty));
    }

    /// Report `[0, seconds)` as loaded.
    pub fn set_buffered(&mut self, seconds: f64) {
        self.buffered = seconds;
        self.notify(
            ItemObservation::LoadedTimeRanges,
            ItemNotification::LoadedTimeRanges(vec![TimeRange { start: 0.0, duration: seconds }]),
        );
    }

    /// Jump the playhead and fire every periodic observer once.
    pub fn tick_at(&mut self, time: f64) {
        self.position = time;
        let tokens: Vec<_> = self
            .observers
            .iter()
            .filter(|(_, o)| matches!(o, SimObserver::Periodic { .. }))
            .map(|(t, _)| *t)
            .collect();
        for token in tokens {
            self.emit(EngineEvent::PeriodicTime { token, time });
        }
    }

    pub fn reach_end(&mut self) {
        if let Some(duration) = self.item.as_ref().and_then(|i| i.info.duration) {
            self.position = duration;
        }
        if self.end_action == EndAction::Pause {
            self.playing = false;
        }
        self.at_end = true;
        self.notify(ItemObservation::DidPlayToEnd, ItemNotification::DidPlayToEnd);
    }

    pub fn fail_item(&mut self, reason: &str) {
        self.playing = false;
        self.notify(
            ItemObservation::FailedToPlayToEnd,
            ItemNotification::FailedToPlayToEnd(reason.to_string()),
        );
    }

    // ==================== Virtual clock ====================

    /// Advance the clock by `dt`: buffer, play, stall, end, periodic ticks.
    pub fn advance(&mut self, dt: Duration) {
        let Some(item) = self.item.clone() else {
            return;
        };
        let secs = dt.as_secs_f64();
        let duration = item.info.duration.unwrap_or(f64::INFINITY);

        // Buffer
        if self.buffer_rate > 0.0 && self.buffered < duration {
            self.buffered = (self.buffered + self.buffer_rate * secs).min(duration);
            self.notify(
                ItemObservation::LoadedTimeRanges,
                ItemNotification::LoadedTimeRanges(vec![TimeRange {
                    start: 0.0,
                    duration: self.buffered,
                }]),
            );
        }
        let needed = (self.position + 2.0).min(duration);
        if !self.likely_to_keep_up && self.buffered >= needed {
            self.set_likely_to_keep_up(true);
        }

        // Playhead
        if self.playing && self.likely_to_keep_up && !self.at_end {
            self.position = (self.position + secs).min(duration).min(self.buffered);
            if self.position >= duration {
                trace!("SimEngine: reached end of {}", item.locator);
                self.reach_end();
            } else if self.position >= self.buffered {
                trace!("SimEngine: stalled at {:.2}", self.position);
                self.set_buffer_empty(true);
            }
        }

        // Periodic observers
        let mut ticks = Vec::new();
        for (token, observer) in self.observers.iter_mut() {
            if let SimObserver::Periodic { interval, elapsed } = observer {
                *elapsed += secs;
                while *elapsed >= *interval {
                    *elapsed -= *interval;
                    ticks.push(*token);
                }
            }
        }
        let time = self.position;
        for token in ticks {
            self.emit(EngineEvent::PeriodicTime { token, time });
        }
    }

    // ==================== Internals ====================

    fn emit(&self, event: EngineEvent) {
        if let Some(sink) = &self.sink {
            sink.send(event);
        }
    }

    fn notify(&self, observation: ItemObservation, notification: ItemNotification) {
        let Some(current) = self.item.as_ref().map(|i| i.id) else {
            return;
        };
        for (token, observer) in &self.observers {
            if let SimObserver::Item { item, observation: kind } = observer
                && *item == current
                && *kind == observation
            {
                self.emit(EngineEvent::Item {
                    token: *token,
                    item: current,
                    notification: notification.clone(),
                });
            }
        }
    }

    fn answer_load(&mut self, request: LoadRequest) {
        let result = match self.catalog.get(&request.locator) {
            Some(media) => media.result.clone(),
            None => Err(ResolutionFailure {
                key: MetadataKey::Tracks,
                reason: format!("resource not found: {}", request.locator),
            }),
        };
        debug!("SimEngine: load {:?} answered (ok={})", request.ticket, result.is_ok());
        self.emit(EngineEvent::Loaded {
            ticket: request.ticket,
            result,
        });
    }

    fn finish_seek(&mut self, request: SeekRequest, finished: bool) {
        if finished && self.item.is_some() {
            let duration = self.item.as_ref().and_then(|i| i.info.duration).unwrap_or(f64::INFINITY);
            self.position = request.time.clamp(0.0, duration);
            self.at_end = self.position >= duration;
        }
        self.emit(EngineEvent::SeekFinished {
            ticket: request.ticket,
            finished: finished && self.item.is_some(),
        });
    }

    fn next_token(&mut self) -> ObserverToken {
        self.next_token += 1;
        ObserverToken(self.next_token)
    }
}

impl PlaybackEngine for SimEngine {
    fn connect(&mut self, sink: Sink<EngineEvent>) {
        self.sink = Some(sink);
    }

    fn load(&mut self, request: LoadRequest) {
        self.calls.push(SimCall::Load(request.locator.clone()));
        if self.auto_complete_loads {
            self.answer_load(request);
        } else {
            self.pending_loads.push(request);
        }
    }

    fn cancel_load(&mut self, ticket: LoadTicket) {
        self.calls.push(SimCall::CancelLoad(ticket));
        self.pending_loads.retain(|r| r.ticket != ticket);
    }

    fn replace_item(&mut self, item: Option<EngineItem>) {
        self.calls.push(SimCall::ReplaceItem(item.as_ref().map(|i| i.id)));
        // Seeks against the old item never land
        for request in std::mem::take(&mut self.pending_seeks) {
            self.emit(EngineEvent::SeekFinished {
                ticket: request.ticket,
                finished: false,
            });
        }
        self.buffer_rate = item
            .as_ref()
            .and_then(|i| self.catalog.get(&i.locator))
            .map(|m| m.buffer_rate)
            .unwrap_or(0.0);
        self.item = item;
        self.position = 0.0;
        self.buffered = 0.0;
        self.likely_to_keep_up = false;
        self.at_end = false;
    }

    fn play(&mut self) {
        self.calls.push(SimCall::Play);
        self.playing = true;
    }

    fn pause(&mut self) {
        self.calls.push(SimCall::Pause);
        self.playing = false;
    }

    fn seek(&mut self, request: SeekRequest) {
        self.calls.push(SimCall::Seek {
            time: request.time,
            tolerance: request.tolerance,
        });
        for superseded in std::mem::take(&mut self.pending_seeks) {
            self.emit(EngineEvent::SeekFinished {
                ticket: superseded.ticket,
                finished: false,
            });
        }
        if self.auto_complete_seeks {
            self.finish_seek(request, true);
        } else {
            self.pending_seeks.push(request);
        }
    }

    fn set_action_at_item_end(&mut self, action: EndAction) {
        self.calls.push(SimCall::SetEndAction(action));
        self.end_action = action;
    }

    fn current_time(&self) -> Option<f64> {
        self.item.as_ref().map(|_| self.position)
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn add_periodic_time_observer(&mut self, interval: Duration) -> ObserverToken {
        self.calls.push(SimCall::AddPeriodicObserver(interval));
        let token = self.next_token();
        self.observers.insert(
            token,
            SimObserver::Periodic {
                interval: interval.as_secs_f64().max(1e-3),
                elapsed: 0.0,
            },
        );
        token
    }

    fn add_item_observer(&mut self, item: ItemId, observation: ItemObservation) -> ObserverToken {
        self.calls.push(SimCall::AddItemObserver(observation));
        let token = self.next_token();
        self.observers.insert(token, SimObserver::Item { item, observation });
        token
    }

    fn remove_observer(&mut self, token: ObserverToken) {
        self.calls.push(SimCall::RemoveObserver(token));
        self.observers.remove(&token);
    }
}

// ==================== Thumbnails ====================

/// Simulated `ThumbnailGenerator`: solid frames shaded by time.
pub struct SimThumbnailer {
    sink: Option<Sink<ThumbnailResult>>,
    source: Option<String>,
    pending: Vec<ThumbnailRequest>,
    auto_complete: bool,
    /// Requests past this time fail
    fail_after: Option<f64>,
}

impl Default for SimThumbnailer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimThumbnailer {
    pub fn new() -> Self {
        Self {
            sink: None,
            source: None,
            pending: Vec::new(),
            auto_complete: false,
            fail_after: None,
        }
    }

    pub fn automatic() -> Self {
        Self {
            auto_complete: true,
            ..Self::new()
        }
    }

    pub fn fail_after(mut self, seconds: f64) -> Self {
        self.fail_after = Some(seconds);
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn pending(&self) -> &[ThumbnailRequest] {
        &self.pending
    }

    /// Produce results for every pending request.
    pub fn complete_all(&mut self) {
        for request in std::mem::take(&mut self.pending) {
            self.answer(request);
        }
    }

    /// Frame for `time`: grey level follows the timestamp.
    pub fn frame_for(time: f64, max_size: FrameSize) -> RgbaImage {
        let shade = ((time.max(0.0) * 10.0) as u64 % 256) as u8;
        let width = max_size.width.max(1.0) as u32;
        let height = max_size.height.max(1.0) as u32;
        RgbaImage::from_pixel(width, height, Rgba([shade, shade, shade, 255]))
    }

    fn answer(&self, request: ThumbnailRequest) {
        let outcome = match (&self.source, self.fail_after) {
            (None, _) => ThumbnailOutcome::Failed("no source".to_string()),
            (Some(_), Some(limit)) if request.time > limit => {
                ThumbnailOutcome::Failed(format!("no frame at {:.2}s", request.time))
            }
            (Some(_), _) => ThumbnailOutcome::Succeeded(Self::frame_for(request.time, request.max_size)),
        };
        self.send(ThumbnailResult {
            seq: request.seq,
            requested_time: request.time,
            outcome,
        });
    }

    fn send(&self, result: ThumbnailResult) {
        if let Some(sink) = &self.sink {
            sink.send(result);
        }
    }
}

impl ThumbnailGenerator for SimThumbnailer {
    fn connect(&mut self, sink: Sink<ThumbnailResult>) {
        self.sink = Some(sink);
    }

    fn set_source(&mut self, locator: &str) {
        self.cancel_all();
        self.source = Some(locator.to_string());
    }

    fn generate(&mut self, request: ThumbnailRequest) {
        if self.auto_complete {
            self.answer(request);
        } else {
            self.pending.push(request);
        }
    }

    fn cancel_all(&mut self) {
        for request in std::mem::take(&mut self.pending) {
            self.send(ThumbnailResult {
                seq: request.seq,
                requested_time: request.time,
                outcome: ThumbnailOutcome::Cancelled,
            });
        }
    }
}
