//! Playback orchestration over a platform media engine.
//!
//! **Why**: The engine decodes and renders; somebody still has to decide when
//! to play, what happens at the end of the media, how lifecycle transitions
//! affect playback and which engine answers are still relevant. `PlayerCore`
//! is that somebody.
//!
//! **Used by**: `PlayerController` (control surface), CLI session
//!
//! # Threading
//!
//! `PlayerCore` is single-threaded. Engine and lifecycle notifications are
//! posted into a `UiContext<PlayerMessage>` through the sink given to `new()`;
//! the owner drains the context and feeds each message to `handle()`.
//! Outbound changes are queued on `events()` and picked up with
//! `poll_events()` (or delivered immediately to `events().subscribe()`
//! listeners).
//!
//! # Staleness
//!
//! Every engine answer carries a load ticket, seek ticket or observer token.
//! Answers whose ticket/token is no longer tracked are dropped, so a slow
//! load for a replaced source or a late notification from a removed observer
//! never touches current state.
//!
//! # End of media
//!
//! - `playback_loops`: emit `WillLoop`, seek to zero, keep playing
//! - `playback_freezes_at_end`: stop in place
//! - neither: seek to zero, stop when the seek completes

use crate::config::PlayerSettings;
use crate::core::error::PlayerError;
use crate::core::event_bus::EventBus;
use crate::core::lifecycle::{LifecycleEvent, LifecycleHub, LifecycleSubscription};
use crate::core::player_events::{PlayerEvent, PlayerMessage, SeekOutcome};
use crate::core::state::{BufferingState, PlaybackState, Tracked};
use crate::core::ui_context::Sink;
use crate::engine::{
    EngineEvent, EngineItem, FrameSize, ItemId, ItemNotification, ItemObservation, LoadRequest, LoadTicket,
    MediaInfo, MediaSource, ObserverToken, PlaybackEngine, ResolutionFailure, SeekRequest, SeekTicket,
    SeekTolerance,
};
use log::{debug, info, trace, warn};
use std::collections::HashMap;

/// Who asked for a seek, which decides what its completion does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeekPurpose {
    /// `seek()` from the owner
    Caller,
    /// Pending seek applied on attach
    Deferred,
    /// Rewind for restart or loop
    Rewind,
    /// End-of-media rewind, stop once it lands
    RewindThenStop,
}

/// Playback state machine driving a `PlaybackEngine`.
pub struct PlayerCore<E: PlaybackEngine> {
    engine: E,
    settings: PlayerSettings,
    playback: Tracked<PlaybackState>,
    buffering: Tracked<BufferingState>,
    events: EventBus<PlayerEvent>,
    current_item: Option<EngineItem>,
    pending_load: Option<(LoadTicket, String)>,
    /// Seek requested while no item was attached
    pending_seek: Option<f64>,
    seeks: HashMap<SeekTicket, SeekPurpose>,
    item_observers: Vec<ObserverToken>,
    time_observer: Option<ObserverToken>,
    last_buffer_time: Option<f64>,
    lifecycle: Option<LifecycleSubscription>,
    next_ticket: u64,
    torn_down: bool,
}

impl<E: PlaybackEngine> PlayerCore<E> {
    /// Wire the engine and lifecycle hub to `sink` and apply `settings`.
    ///
    /// `settings` are expected to be validated already.
    pub fn new(mut engine: E, settings: PlayerSettings, lifecycle: &LifecycleHub, sink: Sink<PlayerMessage>) -> Self {
        engine.connect(sink.map(PlayerMessage::Engine));
        engine.set_muted(settings.muted);
        engine.set_volume(settings.volume);
        engine.set_action_at_item_end(settings.end_action());
        let subscription = lifecycle.subscribe(sink.map(PlayerMessage::Lifecycle));
        info!(
            "PlayerCore initialized (loops={}, freezes_at_end={})",
            settings.playback_loops, settings.playback_freezes_at_end
        );
        Self {
            engine,
            settings,
            playback: Tracked::new(PlaybackState::Stopped),
            buffering: Tracked::new(BufferingState::Unknown),
            events: EventBus::new(),
            current_item: None,
            pending_load: None,
            pending_seek: None,
            seeks: HashMap::new(),
            item_observers: Vec::new(),
            time_observer: None,
            last_buffer_time: None,
            lifecycle: Some(subscription),
            next_ticket: 0,
            torn_down: false,
        }
    }

    // ==================== Accessors ====================

    pub fn playback_state(&self) -> PlaybackState {
        self.playback.get()
    }

    pub fn buffering_state(&self) -> BufferingState {
        self.buffering.get()
    }

    pub fn is_playing(&self) -> bool {
        self.playback.get() == PlaybackState::Playing
    }

    /// Seconds; `None` without an item or for indefinite media.
    pub fn duration(&self) -> Option<f64> {
        self.current_item
            .as_ref()
            .and_then(|item| item.info.duration)
            .filter(|d| d.is_finite())
    }

    /// Seconds; `None` without an item.
    pub fn current_position(&self) -> Option<f64> {
        self.current_item.as_ref()?;
        self.engine.current_time().filter(|t| t.is_finite())
    }

    /// Display size of the first video track, rotation applied.
    pub fn natural_frame_size(&self) -> Option<FrameSize> {
        self.current_item
            .as_ref()?
            .info
            .first_video_track()
            .map(|track| track.display_size())
    }

    pub fn current_item(&self) -> Option<&EngineItem> {
        self.current_item.as_ref()
    }

    pub fn pending_seek(&self) -> Option<f64> {
        self.pending_seek
    }

    /// A locator is being resolved.
    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn events(&self) -> &EventBus<PlayerEvent> {
        &self.events
    }

    /// Take queued outbound events, oldest first.
    pub fn poll_events(&self) -> Vec<PlayerEvent> {
        self.events.poll()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    // ==================== Settings ====================

    pub fn set_playback_loops(&mut self, loops: bool) {
        self.settings.playback_loops = loops;
        self.engine.set_action_at_item_end(self.settings.end_action());
    }

    pub fn set_playback_freezes_at_end(&mut self, freezes: bool) {
        self.settings.playback_freezes_at_end = freezes;
    }

    pub fn set_pauses_when_backgrounded(&mut self, pauses: bool) {
        self.settings.pauses_when_backgrounded = pauses;
    }

    pub fn set_resumes_when_entering_foreground(&mut self, resumes: bool) {
        self.settings.resumes_when_entering_foreground = resumes;
    }

    pub fn set_resumes_when_became_active(&mut self, resumes: bool) {
        self.settings.resumes_when_became_active = resumes;
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.settings.muted = muted;
        self.engine.set_muted(muted);
    }

    pub fn is_muted(&self) -> bool {
        self.engine.is_muted()
    }

    /// Clamped to `0.0..=1.0`.
    pub fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.settings.volume = volume;
        self.engine.set_volume(volume);
    }

    pub fn volume(&self) -> f32 {
        self.engine.volume()
    }

    // ==================== Commands ====================

    /// Replace the media source.
    ///
    /// Returns immediately. Readiness arrives as `SourceReady`, failure as
    /// `StateChanged(Failed)` followed by `Failed(..)`.
    pub fn attach_source(&mut self, source: MediaSource) {
        if self.torn_down {
            warn!("attach_source after teardown ignored");
            return;
        }
        info!("Attaching source {}", source.locator());

        if self.is_playing() {
            self.pause();
        }
        if self.playback.get() == PlaybackState::Failed {
            self.set_playback(PlaybackState::Stopped);
        }

        self.remove_item_observers();
        self.abandon_seeks();
        if let Some((ticket, locator)) = self.pending_load.take() {
            debug!("Cancelling load {:?} for {}", ticket, locator);
            self.engine.cancel_load(ticket);
        }
        if self.current_item.take().is_some() {
            self.engine.replace_item(None);
        }
        self.set_buffering(BufferingState::Unknown);
        self.last_buffer_time = None;

        match source {
            MediaSource::Locator(locator) => {
                let ticket = LoadTicket(self.next_ticket());
                self.pending_load = Some((ticket, locator.clone()));
                self.engine.load(LoadRequest { ticket, locator });
            }
            MediaSource::Resolved { locator, info } => self.on_resolved(locator, Ok(info)),
        }
    }

    /// Emit `WillRestart`, rewind to zero and play.
    pub fn play_from_beginning(&mut self) {
        if !self.can_play() {
            return;
        }
        self.events.emit(PlayerEvent::WillRestart);
        if self.current_item.is_some() {
            self.issue_seek(0.0, None, SeekPurpose::Rewind);
        }
        self.play_from_current_time();
    }

    pub fn play_from_current_time(&mut self) {
        if !self.can_play() {
            return;
        }
        self.set_playback(PlaybackState::Playing);
        self.engine.play();
    }

    /// Pause if playing; otherwise nothing.
    pub fn pause(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.engine.pause();
        self.set_playback(PlaybackState::Paused);
    }

    /// Stop and emit `DidEnd`. Nothing happens when stopped or failed.
    pub fn stop(&mut self) {
        match self.playback.get() {
            PlaybackState::Stopped | PlaybackState::Failed => return,
            PlaybackState::Playing | PlaybackState::Paused => {}
        }
        self.engine.pause();
        self.set_playback(PlaybackState::Stopped);
        self.events.emit(PlayerEvent::DidEnd);
    }

    /// Seek to `time` seconds.
    ///
    /// Without an item the request is kept as the pending seek (last one
    /// wins) and applied once the next item is attached.
    pub fn seek(&mut self, time: f64, tolerance: Option<SeekTolerance>) -> SeekOutcome {
        if self.current_item.is_none() {
            debug!("No item yet, deferring seek to {:.3}", time);
            self.pending_seek = Some(time);
            return SeekOutcome::Deferred;
        }
        SeekOutcome::Issued(self.issue_seek(time, tolerance, SeekPurpose::Caller))
    }

    /// Pause, drop observers, cancel the pending load and release the
    /// lifecycle subscription. Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.engine.pause();
        self.remove_item_observers();
        if let Some((ticket, _)) = self.pending_load.take() {
            self.engine.cancel_load(ticket);
        }
        self.seeks.clear();
        if let Some(mut subscription) = self.lifecycle.take() {
            subscription.release();
        }
        debug!("PlayerCore torn down");
    }

    // ==================== Inbound ====================

    /// Process one message drained from the UI context.
    pub fn handle(&mut self, msg: PlayerMessage) {
        if self.torn_down {
            trace!("Dropping {:?} after teardown", msg);
            return;
        }
        match msg {
            PlayerMessage::Engine(event) => self.handle_engine(event),
            PlayerMessage::Lifecycle(event) => self.handle_lifecycle(event),
        }
    }

    fn handle_engine(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Loaded { ticket, result } => {
                let Some((_, locator)) = self.pending_load.take_if(|(pending, _)| *pending == ticket) else {
                    trace!("Stale load answer {:?} ignored", ticket);
                    return;
                };
                self.on_resolved(locator, result);
            }
            EngineEvent::PeriodicTime { token, time } => {
                if self.time_observer != Some(token) {
                    trace!("Stale periodic tick {:?} ignored", token);
                    return;
                }
                self.events.emit(PlayerEvent::CurrentTimeChanged(time));
            }
            EngineEvent::Item {
                token,
                item,
                notification,
            } => {
                if !self.item_observers.contains(&token) || self.current_item.as_ref().map(|i| i.id) != Some(item) {
                    trace!("Stale item notification {:?} ignored", token);
                    return;
                }
                self.on_item_notification(notification);
            }
            EngineEvent::SeekFinished { ticket, finished } => self.on_seek_finished(ticket, finished),
        }
    }

    fn handle_lifecycle(&mut self, event: LifecycleEvent) {
        debug!("Lifecycle {:?} in state {}", event, self.playback.get());
        match event {
            LifecycleEvent::WillResignActive => {
                if self.is_playing() {
                    self.pause();
                }
            }
            LifecycleEvent::DidEnterBackground => {
                if self.is_playing() && self.settings.pauses_when_backgrounded {
                    self.pause();
                }
            }
            LifecycleEvent::WillEnterForeground => {
                if self.settings.resumes_when_entering_foreground && self.should_resume() {
                    self.play_from_current_time();
                }
            }
            LifecycleEvent::DidBecomeActive => {
                if self.settings.resumes_when_became_active && self.should_resume() {
                    self.play_from_current_time();
                }
            }
        }
    }

    // ==================== Internals ====================

    fn on_resolved(&mut self, locator: String, result: Result<MediaInfo, ResolutionFailure>) {
        match result {
            Err(ResolutionFailure { key, reason }) => {
                warn!("Failed to load {:?} for {}: {}", key, locator, reason);
                self.fail(PlayerError::ResolutionFailure { locator, key, reason });
            }
            Ok(info) if !info.playable => {
                warn!("Source {} is not playable", locator);
                self.fail(PlayerError::UnplayableSource { locator });
            }
            Ok(info) => self.install_item(locator, info),
        }
    }

    fn install_item(&mut self, locator: String, info: MediaInfo) {
        let item = EngineItem {
            id: ItemId::new(),
            locator,
            info,
        };
        let id = item.id;
        let duration = item.info.duration.filter(|d| d.is_finite());
        info!("Source ready: {} (item {}, duration {:?})", item.locator, id, duration);

        self.engine.replace_item(Some(item.clone()));
        self.current_item = Some(item);

        if let Some(time) = self.pending_seek.take() {
            let ticket = self.issue_seek(time, None, SeekPurpose::Deferred);
            self.events.emit(PlayerEvent::DeferredSeekIssued { ticket, time });
        }

        self.add_item_observers(id);
        self.engine.set_action_at_item_end(self.settings.end_action());
        self.events.emit(PlayerEvent::SourceReady { duration });
    }

    fn on_item_notification(&mut self, notification: ItemNotification) {
        match notification {
            ItemNotification::LikelyToKeepUp(true) => {
                if self.set_buffering(BufferingState::ReadyToPlay) && self.is_playing() {
                    // Engine may have stalled; nudge it once per transition
                    self.engine.play();
                }
            }
            ItemNotification::BufferEmpty(true) => {
                self.set_buffering(BufferingState::Buffering);
            }
            ItemNotification::LikelyToKeepUp(false) | ItemNotification::BufferEmpty(false) => {}
            ItemNotification::LoadedTimeRanges(ranges) => {
                let Some(first) = ranges.first() else {
                    return;
                };
                let end = first.end();
                if self.last_buffer_time != Some(end) {
                    self.last_buffer_time = Some(end);
                    self.events.emit(PlayerEvent::BufferTimeChanged(end));
                }
            }
            ItemNotification::DidPlayToEnd => self.on_did_play_to_end(),
            ItemNotification::FailedToPlayToEnd(reason) => {
                let locator = self.current_item.as_ref().map(|i| i.locator.clone()).unwrap_or_default();
                warn!("Playback of {} failed: {}", locator, reason);
                self.fail(PlayerError::EngineFailure { locator, reason });
            }
        }
    }

    fn on_did_play_to_end(&mut self) {
        debug!("Reached end of media");
        if self.settings.playback_loops {
            self.events.emit(PlayerEvent::WillLoop);
            self.issue_seek(0.0, None, SeekPurpose::Rewind);
        } else if self.settings.playback_freezes_at_end {
            self.stop();
        } else {
            self.issue_seek(0.0, None, SeekPurpose::RewindThenStop);
        }
    }

    fn on_seek_finished(&mut self, ticket: SeekTicket, finished: bool) {
        let Some(purpose) = self.seeks.remove(&ticket) else {
            trace!("Stale seek completion {:?} ignored", ticket);
            return;
        };
        trace!("Seek {:?} ({:?}) finished={}", ticket, purpose, finished);
        match purpose {
            SeekPurpose::Caller | SeekPurpose::Deferred => {
                self.events.emit(PlayerEvent::SeekFinished { ticket, finished });
            }
            SeekPurpose::Rewind => {}
            SeekPurpose::RewindThenStop => self.stop(),
        }
    }

    fn issue_seek(&mut self, time: f64, tolerance: Option<SeekTolerance>, purpose: SeekPurpose) -> SeekTicket {
        let ticket = SeekTicket(self.next_ticket());
        self.seeks.insert(ticket, purpose);
        trace!("Seek {:?} to {:.3} ({:?})", ticket, time, purpose);
        self.engine.seek(SeekRequest { ticket, time, tolerance });
        ticket
    }

    /// Forget every seek issued against the outgoing item. Owners of caller
    /// seeks get `SeekFinished { finished: false }` right away; the engine's
    /// own late completions are then stale and dropped.
    fn abandon_seeks(&mut self) {
        for (ticket, purpose) in std::mem::take(&mut self.seeks) {
            debug!("Seek {:?} ({:?}) superseded by source change", ticket, purpose);
            if matches!(purpose, SeekPurpose::Caller | SeekPurpose::Deferred) {
                self.events.emit(PlayerEvent::SeekFinished { ticket, finished: false });
            }
        }
    }

    fn add_item_observers(&mut self, item: ItemId) {
        for observation in ItemObservation::ALL {
            let token = self.engine.add_item_observer(item, observation);
            self.item_observers.push(token);
        }
        let interval = self.settings.periodic_interval();
        self.time_observer = Some(self.engine.add_periodic_time_observer(interval));
    }

    fn remove_item_observers(&mut self) {
        for token in self.item_observers.drain(..) {
            self.engine.remove_observer(token);
        }
        if let Some(token) = self.time_observer.take() {
            self.engine.remove_observer(token);
        }
    }

    fn fail(&mut self, error: PlayerError) {
        self.engine.pause();
        self.set_playback(PlaybackState::Failed);
        self.events.emit(PlayerEvent::Failed(error));
    }

    fn can_play(&self) -> bool {
        if self.torn_down {
            warn!("Play after teardown ignored");
            return false;
        }
        if self.playback.get() == PlaybackState::Failed {
            warn!("Play rejected: player failed, attach a new source first");
            return false;
        }
        true
    }

    /// Foreground/active resume applies to a paused player only.
    ///
    /// Narrower than "anything but playing": a stopped or failed player
    /// stays put when the app comes back.
    fn should_resume(&self) -> bool {
        self.playback.get() == PlaybackState::Paused
    }

    fn set_playback(&mut self, state: PlaybackState) -> bool {
        let changed = self.playback.set(state);
        if changed {
            debug!("Playback state -> {}", state);
            self.events.emit(PlayerEvent::StateChanged(state));
        }
        changed
    }

    fn set_buffering(&mut self, state: BufferingState) -> bool {
        let changed = self.buffering.set(state);
        if changed {
            debug!("Buffering state -> {}", state);
            self.events.emit(PlayerEvent::BufferingChanged(state));
        }
        changed
    }

    fn next_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }
}

impl<E: PlaybackEngine> Drop for PlayerCore<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ui_context::UiContext;
    use crate::engine::sim::{SimCall, SimEngine, SimMedia};
    use crate::engine::{MetadataKey, TrackInfo, TrackRotation};

    const SRC: &str = "sim://clip";

    struct Harness {
        player: PlayerCore<SimEngine>,
        ctx: UiContext<PlayerMessage>,
        hub: LifecycleHub,
    }

    impl Harness {
        fn new(settings: PlayerSettings) -> Self {
            let ctx = UiContext::new();
            let hub = LifecycleHub::new();
            let mut engine = SimEngine::new();
            engine.register(SRC, SimMedia::playable(120.0));
            let player = PlayerCore::new(engine, settings, &hub, ctx.sink(|m: PlayerMessage| m));
            Self { player, ctx, hub }
        }

        fn pump(&mut self) -> Vec<PlayerEvent> {
            loop {
                let batch = self.ctx.drain();
                if batch.is_empty() {
                    break;
                }
                for msg in batch {
                    self.player.handle(msg);
                }
            }
            self.player.poll_events()
        }

        /// Attach `SRC`, resolve it, return events.
        fn load(&mut self) -> Vec<PlayerEvent> {
            self.player.attach_source(SRC.into());
            self.player.engine_mut().complete_loads();
            self.pump()
        }

        fn engine(&mut self) -> &mut SimEngine {
            self.player.engine_mut()
        }
    }

    fn states(events: &[PlayerEvent]) -> Vec<PlaybackState> {
        events
            .iter()
            .filter_map(|e| match e {
                PlayerEvent::StateChanged(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    fn count_calls(engine: &SimEngine, call: &SimCall) -> usize {
        engine.calls().iter().filter(|c| *c == call).count()
    }

    #[test]
    fn test_duplicate_commands_emit_once() {
        let mut h = Harness::new(PlayerSettings::default());
        h.load();
        h.player.play_from_current_time();
        h.player.play_from_current_time();
        h.player.pause();
        h.player.pause();
        assert_eq!(
            states(&h.pump()),
            vec![PlaybackState::Playing, PlaybackState::Paused]
        );
    }

    #[test]
    fn test_source_ready_reports_metadata() {
        let mut h = Harness::new(PlayerSettings::default());
        assert_eq!(h.player.duration(), None);
        assert_eq!(h.player.current_position(), None);
        assert_eq!(h.player.natural_frame_size(), None);

        let events = h.load();
        assert!(events.contains(&PlayerEvent::SourceReady { duration: Some(120.0) }));
        assert_eq!(h.player.duration(), Some(120.0));
        assert_eq!(h.player.current_position(), Some(0.0));
        assert_eq!(h.player.natural_frame_size(), Some(FrameSize::new(1280.0, 720.0)));
        // 5 item observers + 1 periodic
        assert_eq!(h.player.engine().observer_count(), 6);
    }

    #[test]
    fn test_natural_size_applies_rotation() {
        let mut h = Harness::new(PlayerSettings::default());
        let mut track = TrackInfo::video(1920.0, 1080.0);
        track.rotation = TrackRotation::Quarter;
        h.player.attach_source(MediaSource::Resolved {
            locator: "sim://portrait".into(),
            info: MediaInfo {
                duration: None,
                tracks: vec![TrackInfo::audio(), track],
                playable: true,
            },
        });
        let events = h.pump();
        assert!(events.contains(&PlayerEvent::SourceReady { duration: None }));
        assert_eq!(h.player.duration(), None);
        assert_eq!(h.player.natural_frame_size(), Some(FrameSize::new(1080.0, 1920.0)));
    }

    #[test]
    fn test_attach_while_playing_pauses_first() {
        let mut h = Harness::new(PlayerSettings::default());
        h.load();
        h.player.play_from_current_time();
        h.pump();
        h.engine().clear_calls();

        h.player.attach_source(SRC.into());
        let calls = h.player.engine().calls().to_vec();
        assert_eq!(calls.first(), Some(&SimCall::Pause));
        assert_eq!(h.player.playback_state(), PlaybackState::Paused);
        assert_eq!(h.player.buffering_state(), BufferingState::Unknown);
        assert!(h.player.is_loading());
    }

    #[test]
    fn test_observers_removed_before_new_item_attached() {
        let mut h = Harness::new(PlayerSettings::default());
        h.load();
        h.engine().clear_calls();
        h.load();

        let calls = h.player.engine().calls().to_vec();
        let last_remove = calls
            .iter()
            .rposition(|c| matches!(c, SimCall::RemoveObserver(_)))
            .unwrap();
        let first_add = calls
            .iter()
            .position(|c| matches!(c, SimCall::AddItemObserver(_)))
            .unwrap();
        assert!(last_remove < first_add);
        assert_eq!(calls.iter().filter(|c| matches!(c, SimCall::RemoveObserver(_))).count(), 6);
        assert_eq!(h.player.engine().observer_count(), 6);
    }

    #[test]
    fn test_stale_load_answer_ignored() {
        let mut h = Harness::new(PlayerSettings::default());
        h.player.attach_source(SRC.into());
        h.player.handle(PlayerMessage::Engine(EngineEvent::Loaded {
            ticket: LoadTicket(999),
            result: Err(ResolutionFailure {
                key: MetadataKey::Duration,
                reason: "late".into(),
            }),
        }));
        assert!(h.player.poll_events().is_empty());
        assert!(h.player.is_loading());
        assert_eq!(h.player.playback_state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_deferred_seek_applied_once() {
        let mut h = Harness::new(PlayerSettings::default());
        assert_eq!(h.player.seek(10.0, None), SeekOutcome::Deferred);
        assert_eq!(h.player.seek(42.0, None), SeekOutcome::Deferred);
        assert_eq!(h.player.pending_seek(), Some(42.0));

        let events = h.load();
        assert!(events
            .iter()
            .any(|e| matches!(e, PlayerEvent::DeferredSeekIssued { time, .. } if *time == 42.0)));
        assert_eq!(h.player.engine().seek_calls(), vec![(42.0, None)]);
        assert_eq!(h.player.pending_seek(), None);

        h.engine().clear_calls();
        h.load();
        assert!(h.player.engine().seek_calls().is_empty());
    }

    #[test]
    fn test_seek_completion_surfaces_with_ticket() {
        let mut h = Harness::new(PlayerSettings::default());
        h.load();
        let SeekOutcome::Issued(ticket) = h.player.seek(30.0, Some(SeekTolerance::ZERO)) else {
            panic!("seek should be issued with an item attached");
        };
        h.engine().complete_seeks(false);
        assert!(h.pump().contains(&PlayerEvent::SeekFinished { ticket, finished: false }));
    }

    #[test]
    fn test_resolution_failure_then_recovery() {
        let mut h = Harness::new(PlayerSettings::default());
        h.engine().register("sim://broken", SimMedia::broken(MetadataKey::Playable, "denied"));
        h.player.attach_source("sim://broken".into());
        h.engine().complete_loads();
        let events = h.pump();

        let failed_at = events
            .iter()
            .position(|e| *e == PlayerEvent::StateChanged(PlaybackState::Failed))
            .unwrap();
        assert!(matches!(
            &events[failed_at + 1],
            PlayerEvent::Failed(PlayerError::ResolutionFailure { key: MetadataKey::Playable, .. })
        ));

        // Play is rejected while failed, stop is a no-op
        h.player.play_from_current_time();
        h.player.stop();
        assert!(h.pump().is_empty());

        h.load();
        assert_eq!(h.player.playback_state(), PlaybackState::Stopped);
        h.player.play_from_current_time();
        assert_eq!(h.player.playback_state(), PlaybackState::Playing);
    }

    #[test]
    fn test_unplayable_source_fails() {
        let mut h = Harness::new(PlayerSettings::default());
        h.engine().register("sim://drm", SimMedia::unplayable(60.0));
        h.player.attach_source("sim://drm".into());
        h.engine().complete_loads();
        let events = h.pump();
        assert!(events.contains(&PlayerEvent::Failed(PlayerError::UnplayableSource {
            locator: "sim://drm".into()
        })));
        assert!(h.player.current_item().is_none());
    }

    #[test]
    fn test_engine_failure_forces_failed() {
        let mut h = Harness::new(PlayerSettings::default());
        h.load();
        h.player.play_from_current_time();
        h.pump();
        h.engine().fail_item("decoder died");
        let events = h.pump();
        assert_eq!(states(&events), vec![PlaybackState::Failed]);
        assert!(matches!(events.last(), Some(PlayerEvent::Failed(PlayerError::EngineFailure { .. }))));
    }

    #[test]
    fn test_end_freezes_by_default() {
        let mut h = Harness::new(PlayerSettings::default());
        h.load();
        h.player.play_from_current_time();
        h.pump();
        h.engine().clear_calls();
        h.engine().reach_end();
        let events = h.pump();
        assert_eq!(states(&events), vec![PlaybackState::Stopped]);
        assert!(events.contains(&PlayerEvent::DidEnd));
        assert!(h.player.engine().seek_calls().is_empty());
    }

    #[test]
    fn test_end_loops_without_stopping() {
        let settings = PlayerSettings {
            playback_loops: true,
            ..PlayerSettings::default()
        };
        let mut h = Harness::new(settings);
        h.load();
        assert_eq!(h.player.engine().end_action(), crate::engine::EndAction::None);
        h.player.play_from_current_time();
        h.pump();
        h.engine().reach_end();
        let events = h.pump();
        assert!(events.contains(&PlayerEvent::WillLoop));
        assert!(!events.contains(&PlayerEvent::DidEnd));
        assert_eq!(h.player.engine().seek_calls().last(), Some(&(0.0, None)));
        assert_eq!(h.player.playback_state(), PlaybackState::Playing);
    }

    #[test]
    fn test_end_rewinds_then_stops() {
        let settings = PlayerSettings {
            playback_freezes_at_end: false,
            ..PlayerSettings::default()
        };
        let mut h = Harness::new(settings);
        h.load();
        h.player.play_from_current_time();
        h.pump();
        h.engine().reach_end();
        assert!(states(&h.pump()).is_empty());

        h.engine().complete_seeks(true);
        let events = h.pump();
        assert_eq!(states(&events), vec![PlaybackState::Stopped]);
        assert!(events.contains(&PlayerEvent::DidEnd));
        assert_eq!(h.player.current_position(), Some(0.0));
    }

    #[test]
    fn test_set_playback_loops_reapplies_end_action() {
        let mut h = Harness::new(PlayerSettings::default());
        h.player.set_playback_loops(true);
        assert_eq!(h.player.engine().end_action(), crate::engine::EndAction::None);
        h.player.set_playback_loops(false);
        assert_eq!(h.player.engine().end_action(), crate::engine::EndAction::Pause);
    }

    #[test]
    fn test_ready_to_play_resumes_engine_once() {
        let mut h = Harness::new(PlayerSettings::default());
        h.load();
        h.player.play_from_current_time();
        h.pump();
        h.engine().clear_calls();

        h.engine().set_likely_to_keep_up(true);
        h.engine().set_likely_to_keep_up(true);
        let events = h.pump();
        assert_eq!(
            events,
            vec![PlayerEvent::BufferingChanged(BufferingState::ReadyToPlay)]
        );
        assert_eq!(count_calls(h.player.engine(), &SimCall::Play), 1);

        h.engine().set_buffer_empty(true);
        assert_eq!(h.pump(), vec![PlayerEvent::BufferingChanged(BufferingState::Buffering)]);
    }

    #[test]
    fn test_buffer_time_deduplicated() {
        let mut h = Harness::new(PlayerSettings::default());
        h.load();
        h.engine().set_buffered(30.0);
        h.engine().set_buffered(30.0);
        h.engine().set_buffered(45.0);
        assert_eq!(
            h.pump(),
            vec![PlayerEvent::BufferTimeChanged(30.0), PlayerEvent::BufferTimeChanged(45.0)]
        );
    }

    #[test]
    fn test_periodic_time_reported() {
        let mut h = Harness::new(PlayerSettings::default());
        h.load();
        h.engine().tick_at(60.0);
        assert_eq!(h.pump(), vec![PlayerEvent::CurrentTimeChanged(60.0)]);
    }

    #[test]
    fn test_notifications_from_replaced_item_ignored() {
        let mut h = Harness::new(PlayerSettings::default());
        h.load();
        let old_item = h.player.current_item().map(|i| i.id).unwrap();
        h.load();

        h.player.handle(PlayerMessage::Engine(EngineEvent::Item {
            token: ObserverToken(1),
            item: old_item,
            notification: ItemNotification::DidPlayToEnd,
        }));
        h.player.handle(PlayerMessage::Engine(EngineEvent::PeriodicTime {
            token: ObserverToken(6),
            time: 99.0,
        }));
        assert!(h.player.poll_events().is_empty());
    }

    #[test]
    fn test_rewind_from_replaced_item_does_not_stop_new_source() {
        let settings = PlayerSettings {
            playback_freezes_at_end: false,
            ..PlayerSettings::default()
        };
        let mut h = Harness::new(settings);
        h.load();
        h.player.play_from_current_time();
        h.pump();
        h.engine().reach_end();
        h.pump();
        assert_eq!(h.player.engine().pending_seek_count(), 1);

        h.player.attach_source(SRC.into());
        h.player.play_from_beginning();
        h.engine().complete_loads();
        let events = h.pump();

        assert!(!events.contains(&PlayerEvent::DidEnd));
        assert_eq!(states(&events), vec![PlaybackState::Paused, PlaybackState::Playing]);
        assert_eq!(h.player.playback_state(), PlaybackState::Playing);
    }

    #[test]
    fn test_caller_seek_superseded_by_new_source() {
        let mut h = Harness::new(PlayerSettings::default());
        h.load();
        let SeekOutcome::Issued(ticket) = h.player.seek(30.0, Some(SeekTolerance::ZERO)) else {
            panic!("seek should be issued with an item attached");
        };

        h.player.attach_source(SRC.into());
        h.engine().complete_loads();
        let events = h.pump();

        // Reported once, at attach time; the engine's own late answer is dropped
        let finished: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, PlayerEvent::SeekFinished { .. }))
            .collect();
        assert_eq!(finished, vec![&PlayerEvent::SeekFinished { ticket, finished: false }]);
        assert!(events.contains(&PlayerEvent::SourceReady { duration: Some(120.0) }));
    }

    #[test]
    fn test_late_seek_completion_after_source_change_ignored() {
        let mut h = Harness::new(PlayerSettings::default());
        h.load();
        let SeekOutcome::Issued(ticket) = h.player.seek(80.0, None) else {
            panic!("seek should be issued with an item attached");
        };
        h.load();

        h.player.handle(PlayerMessage::Engine(EngineEvent::SeekFinished { ticket, finished: true }));
        assert!(h.player.poll_events().is_empty());
        assert_eq!(h.player.playback_state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_lifecycle_pause_and_resume() {
        let mut h = Harness::new(PlayerSettings::default());
        h.load();
        h.player.play_from_current_time();
        h.pump();

        h.hub.post(LifecycleEvent::DidEnterBackground);
        assert_eq!(states(&h.pump()), vec![PlaybackState::Paused]);

        h.hub.post(LifecycleEvent::WillEnterForeground);
        assert_eq!(states(&h.pump()), vec![PlaybackState::Playing]);
    }

    #[test]
    fn test_lifecycle_respects_flags() {
        let settings = PlayerSettings {
            pauses_when_backgrounded: false,
            resumes_when_became_active: false,
            ..PlayerSettings::default()
        };
        let mut h = Harness::new(settings);
        h.load();
        h.player.play_from_current_time();
        h.pump();

        h.hub.post(LifecycleEvent::DidEnterBackground);
        assert!(states(&h.pump()).is_empty());

        h.hub.post(LifecycleEvent::WillResignActive);
        assert_eq!(states(&h.pump()), vec![PlaybackState::Paused]);
        h.hub.post(LifecycleEvent::DidBecomeActive);
        assert!(states(&h.pump()).is_empty());
    }

    #[test]
    fn test_stopped_player_not_resumed() {
        let mut h = Harness::new(PlayerSettings::default());
        h.load();
        h.hub.post(LifecycleEvent::DidBecomeActive);
        assert!(h.pump().is_empty());
        assert_eq!(h.player.playback_state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_play_from_beginning_rewinds() {
        let mut h = Harness::new(PlayerSettings::default());
        h.load();
        h.player.play_from_beginning();
        let events = h.pump();
        assert_eq!(events.first(), Some(&PlayerEvent::WillRestart));
        assert_eq!(h.player.engine().seek_calls(), vec![(0.0, None)]);
        assert!(h.player.engine().is_playing());
    }

    #[test]
    fn test_teardown_idempotent() {
        let mut h = Harness::new(PlayerSettings::default());
        h.load();
        h.player.play_from_current_time();
        assert_eq!(h.hub.subscriber_count(), 1);

        h.player.teardown();
        h.player.teardown();
        assert!(h.player.is_torn_down());
        assert_eq!(h.hub.subscriber_count(), 0);
        assert_eq!(h.player.engine().observer_count(), 0);
        assert!(!h.player.engine().is_playing());

        h.hub.post(LifecycleEvent::WillEnterForeground);
        h.player.handle(PlayerMessage::Lifecycle(LifecycleEvent::WillEnterForeground));
        assert_eq!(h.player.playback_state(), PlaybackState::Playing);
        assert_eq!(count_calls(h.player.engine(), &SimCall::Play), 1);
    }

    #[test]
    fn test_drop_releases_lifecycle() {
        let hub = LifecycleHub::new();
        let ctx: UiContext<PlayerMessage> = UiContext::new();
        {
            let _player = PlayerCore::new(
                SimEngine::new(),
                PlayerSettings::default(),
                &hub,
                ctx.sink(|m: PlayerMessage| m),
            );
            assert_eq!(hub.subscriber_count(), 1);
        }
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_volume_clamped() {
        let mut h = Harness::new(PlayerSettings::default());
        h.player.set_volume(3.0);
        assert_eq!(h.player.volume(), 1.0);
        h.player.set_muted(true);
        assert!(h.player.is_muted());
    }
}
