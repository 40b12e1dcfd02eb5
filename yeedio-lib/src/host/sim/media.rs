//! Simulated media element.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_SPEED;
use crate::host::{ElementId, Listener, MediaElement, MediaEvent, ReadyState, Size};
use crate::timing::Scheduler;

/// Initial state of a simulated video, as written in scenario files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSpec {
    /// Rendered width.
    pub width: u32,
    /// Rendered height.
    pub height: u32,
    /// Intrinsic width of the loaded media, 0 before metadata.
    pub video_width: u32,
    /// Intrinsic height of the loaded media, 0 before metadata.
    pub video_height: u32,
    pub playing: bool,
    pub ended: bool,
    pub ready_state: Option<ReadyState>,
}

impl VideoSpec {
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn playing(mut self) -> Self {
        self.playing = true;
        self
    }

    pub fn ended(mut self) -> Self {
        self.ended = true;
        self
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.video_width = width;
        self.video_height = height;
        self
    }

    pub fn with_ready_state(mut self, ready_state: ReadyState) -> Self {
        self.ready_state = Some(ready_state);
        self
    }

    fn initial_ready_state(&self) -> ReadyState {
        self.ready_state.unwrap_or_else(|| {
            if self.playing || (self.video_width > 0 && self.video_height > 0) {
                ReadyState::HaveEnoughData
            } else {
                ReadyState::HaveNothing
            }
        })
    }
}

impl Default for VideoSpec {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            video_width: 0,
            video_height: 0,
            playing: false,
            ended: false,
            ready_state: None,
        }
    }
}

#[derive(Debug, Clone)]
struct VideoState {
    connected: bool,
    paused: bool,
    ended: bool,
    ready_state: ReadyState,
    client_size: Size,
    intrinsic_size: Size,
    playback_rate: f64,
    rate_writes: usize,
}

/// In-memory `<video>` element.
///
/// Property writes that the browser reports through events (rate changes,
/// playback start, new sources) queue those events on the scheduler with zero
/// delay, the way the browser queues them as tasks. [`SimVideo::dispatch`]
/// fires an event synchronously for tests that script the host page.
pub struct SimVideo {
    id: ElementId,
    scheduler: Scheduler,
    this: Weak<SimVideo>,
    state: Mutex<VideoState>,
    listeners: Mutex<Vec<(MediaEvent, Listener)>>,
}

impl SimVideo {
    pub(super) fn new(id: ElementId, spec: &VideoSpec, scheduler: &Scheduler) -> Arc<Self> {
        let state = VideoState {
            connected: true,
            paused: !spec.playing || spec.ended,
            ended: spec.ended,
            ready_state: spec.initial_ready_state(),
            client_size: Size::new(spec.width, spec.height),
            intrinsic_size: Size::new(spec.video_width, spec.video_height),
            playback_rate: DEFAULT_SPEED,
            rate_writes: 0,
        };
        Arc::new_cyclic(|this| Self {
            id,
            scheduler: scheduler.clone(),
            this: this.clone(),
            state: Mutex::new(state),
            listeners: Mutex::new(Vec::new()),
        })
    }

    /// Start playback and queue `play`.
    pub fn play(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.paused = false;
            state.ended = false;
            state.ready_state = state.ready_state.max(ReadyState::HaveEnoughData);
        }
        self.queue(MediaEvent::Play);
    }

    pub fn pause(&self) {
        self.state.lock().unwrap().paused = true;
    }

    /// Reach the end of the current media.
    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap();
        state.ended = true;
        state.paused = true;
    }

    pub fn set_client_size(&self, size: Size) {
        self.state.lock().unwrap().client_size = size;
    }

    pub fn set_ready_state(&self, ready_state: ReadyState) {
        self.state.lock().unwrap().ready_state = ready_state;
    }

    /// Load a new source into the same element, as a playlist advance does.
    ///
    /// The playback rate drops back to the default and the metadata and data
    /// events are queued.
    pub fn load_source(&self, resolution: Size) {
        let rate_changed = {
            let mut state = self.state.lock().unwrap();
            let rate_changed = state.playback_rate != DEFAULT_SPEED;
            state.playback_rate = DEFAULT_SPEED;
            state.intrinsic_size = resolution;
            state.ready_state = ReadyState::HaveEnoughData;
            state.ended = false;
            rate_changed
        };
        if rate_changed {
            self.queue(MediaEvent::RateChange);
        }
        self.queue(MediaEvent::LoadedMetadata);
        self.queue(MediaEvent::LoadedData);
    }

    /// Change the intrinsic size mid-stream (adaptive bitrate switch).
    pub fn resize(&self, resolution: Size) {
        let changed = {
            let mut state = self.state.lock().unwrap();
            let changed = state.intrinsic_size != resolution;
            state.intrinsic_size = resolution;
            changed
        };
        if changed {
            self.queue(MediaEvent::Resize);
        }
    }

    /// Set the intrinsic size without any event, as if metadata was already
    /// present when the agent arrived.
    pub fn set_intrinsic_size(&self, resolution: Size) {
        self.state.lock().unwrap().intrinsic_size = resolution;
    }

    /// Overwrite the playback rate without queuing `ratechange`.
    pub fn force_playback_rate(&self, rate: f64) {
        self.state.lock().unwrap().playback_rate = rate;
    }

    /// Fire `event` synchronously to every registered listener.
    pub fn dispatch(&self, event: MediaEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .filter(|(kind, _)| *kind == event)
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener();
        }
    }

    pub fn listener_count(&self, event: MediaEvent) -> usize {
        self.listeners
            .lock()
            .unwrap()
            .iter()
            .filter(|(kind, _)| *kind == event)
            .count()
    }

    /// Number of `playbackRate` writes so far, from any caller.
    pub fn rate_writes(&self) -> usize {
        self.state.lock().unwrap().rate_writes
    }

    pub(super) fn disconnect(&self) {
        self.state.lock().unwrap().connected = false;
    }

    pub(super) fn reconnect(&self) {
        self.state.lock().unwrap().connected = true;
    }

    fn queue(&self, event: MediaEvent) {
        let this = self.this.clone();
        self.scheduler.set_timeout(Duration::ZERO, move || {
            if let Some(video) = this.upgrade() {
                video.dispatch(event);
            }
        });
    }
}

impl MediaElement for SimVideo {
    fn id(&self) -> ElementId {
        self.id
    }

    fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    fn is_ended(&self) -> bool {
        self.state.lock().unwrap().ended
    }

    fn ready_state(&self) -> ReadyState {
        self.state.lock().unwrap().ready_state
    }

    fn client_size(&self) -> Size {
        self.state.lock().unwrap().client_size
    }

    fn intrinsic_size(&self) -> Size {
        self.state.lock().unwrap().intrinsic_size
    }

    fn playback_rate(&self) -> f64 {
        self.state.lock().unwrap().playback_rate
    }

    fn set_playback_rate(&self, rate: f64) {
        let changed = {
            let mut state = self.state.lock().unwrap();
            state.rate_writes += 1;
            let changed = state.playback_rate != rate;
            state.playback_rate = rate;
            changed
        };
        if changed {
            self.queue(MediaEvent::RateChange);
        }
    }

    fn add_listener(&self, event: MediaEvent, listener: Listener) {
        self.listeners.lock().unwrap().push((event, listener));
    }
}

impl std::fmt::Debug for SimVideo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimVideo")
            .field("id", &self.id)
            .field("state", &*self.state.lock().unwrap())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn video(spec: VideoSpec) -> (Scheduler, Arc<SimVideo>) {
        let scheduler = Scheduler::new();
        let video = SimVideo::new(ElementId(1), &spec, &scheduler);
        (scheduler, video)
    }

    fn count_events(video: &SimVideo, event: MediaEvent) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        video.add_listener(
            event,
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        count
    }

    #[test]
    fn rate_change_event_is_queued_not_synchronous() {
        let (scheduler, video) = video(VideoSpec::default());
        let fired = count_events(&video, MediaEvent::RateChange);

        video.set_playback_rate(2.0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        scheduler.advance(Duration::ZERO);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn writing_the_same_rate_fires_nothing() {
        let (scheduler, video) = video(VideoSpec::default());
        let fired = count_events(&video, MediaEvent::RateChange);

        video.set_playback_rate(1.0);
        scheduler.advance(Duration::ZERO);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(video.rate_writes(), 1);
    }

    #[test]
    fn loading_a_source_resets_rate_and_reports_data() {
        let (scheduler, video) = video(VideoSpec::sized(640, 360).playing());
        let loaded = count_events(&video, MediaEvent::LoadedData);
        video.set_playback_rate(3.0);

        video.load_source(Size::new(1280, 720));
        scheduler.advance(Duration::ZERO);

        assert_eq!(video.playback_rate(), DEFAULT_SPEED);
        assert_eq!(video.intrinsic_size(), Size::new(1280, 720));
        assert_eq!(loaded.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn video_defaults_derive_ready_state() {
        let (_, paused) = video(VideoSpec::default());
        assert_eq!(paused.ready_state(), ReadyState::HaveNothing);
        assert!(paused.is_paused());

        let (_, playing) = video(VideoSpec::default().playing());
        assert_eq!(playing.ready_state(), ReadyState::HaveEnoughData);
        assert!(!playing.is_paused());
    }
}
