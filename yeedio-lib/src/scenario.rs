//! Scripted pages for the simulated host.
//!
//! A scenario describes a tab as JSON: its frames, the videos each frame
//! starts with, and host-page events to replay at fixed virtual times.
//!
//! ```json
//! {
//!   "frames": [
//!     { "name": "top", "videos": [ { "width": 1280, "height": 720, "playing": true } ] },
//!     { "name": "ad", "videos": [] }
//!   ],
//!   "events": [
//!     { "at_ms": 1000, "frame": "top", "action": { "type": "reset_rate_every", "period_ms": 300 } },
//!     { "at_ms": 2000, "frame": "top", "action": { "type": "load_source", "width": 1920, "height": 1080 } }
//!   ]
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::agent::AgentSettings;
use crate::constants::DEFAULT_SPEED;
use crate::control::{Frame, Tab};
use crate::host::sim::{SimDocument, SimPort, SimVideo, VideoSpec};
use crate::host::{ElementId, MediaElement, Size};
use crate::levels::EnforcedSettings;
use crate::protocol::Resolution;
use crate::timing::Scheduler;

/// Error type for loading and building scenarios.
#[derive(Debug)]
pub enum ScenarioError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    /// An event names a frame the scenario does not declare.
    UnknownFrame(String),
}

impl Display for ScenarioError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read scenario: {}", err),
            Self::Parse(err) => write!(f, "malformed scenario: {}", err),
            Self::UnknownFrame(name) => write!(f, "event refers to unknown frame '{}'", name),
        }
    }
}

impl std::error::Error for ScenarioError {}

impl From<std::io::Error> for ScenarioError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for ScenarioError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err)
    }
}

/// One frame of the scripted page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameSpec {
    pub name: String,
    pub videos: Vec<VideoSpec>,
    /// The document is still parsing until a `finish_loading` event.
    pub loading: bool,
    /// The host provides audio processing.
    pub audio: bool,
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self {
            name: "top".to_string(),
            videos: Vec::new(),
            loading: false,
            audio: true,
        }
    }
}

/// Something the host page does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Write `playbackRate` as page script would.
    SetRate { rate: f64 },
    /// Change the rate without a `ratechange` event.
    ForceRate { rate: f64 },
    /// Write `rate` every `period_ms` from now on.
    ResetRateEvery {
        period_ms: u64,
        #[serde(default = "default_rate")]
        rate: f64,
    },
    LoadSource { width: u32, height: u32 },
    Resize { width: u32, height: u32 },
    Play,
    Pause,
    Finish,
    InsertVideo {
        #[serde(default)]
        video: VideoSpec,
    },
    InsertPlainNode,
    RemoveVideo,
    Navigate {
        #[serde(default)]
        videos: Vec<VideoSpec>,
    },
    FinishLoading,
    BlockAudio { reason: String },
}

fn default_rate() -> f64 {
    DEFAULT_SPEED
}

/// An action replayed at a virtual time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub at_ms: u64,
    /// Frame name; the first frame when absent.
    #[serde(default)]
    pub frame: Option<String>,
    /// Index of the video the action applies to, in current tree order.
    #[serde(default)]
    pub video: usize,
    pub action: Action,
}

/// A scripted tab.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Injection into this page is refused for the given reason.
    pub restricted: Option<String>,
    pub frames: Vec<FrameSpec>,
    pub events: Vec<Event>,
    pub agent: AgentSettings,
}

impl Scenario {
    pub fn from_json(raw: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// A single frame holding one playing video.
    pub fn single_video(video: VideoSpec) -> Self {
        Self {
            frames: vec![FrameSpec {
                videos: vec![video],
                ..FrameSpec::default()
            }],
            ..Self::default()
        }
    }

    /// Build the page and schedule every event on a fresh scheduler.
    pub fn build(&self) -> Result<SimPage, ScenarioError> {
        let scheduler = Scheduler::new();
        let port = SimPort::new();
        let mut tab = match &self.restricted {
            Some(reason) => Tab::restricted(scheduler.clone(), reason),
            None => Tab::new(scheduler.clone()),
        };

        let mut documents = Vec::new();
        for spec in &self.frames {
            let document = match (spec.loading, spec.audio) {
                (true, _) => SimDocument::loading(&scheduler),
                (false, true) => SimDocument::new(&scheduler),
                (false, false) => SimDocument::without_audio(&scheduler),
            };
            if spec.loading && !spec.audio {
                warn!("frame {}: loading frames always have audio", spec.name);
            }
            for video in &spec.videos {
                document.preload(video);
            }
            let frame = Frame::new(&spec.name, document.clone(), scheduler.clone(), port.clone())
                .with_settings(self.agent);
            tab.add_frame(frame);
            documents.push((spec.name.clone(), document));
        }

        let page = SimPage {
            tab: Arc::new(tab),
            scheduler,
            port,
            documents,
        };
        for event in &self.events {
            page.schedule(event)?;
        }
        Ok(page)
    }
}

/// Live state of one frame after a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub frame: String,
    pub injected: bool,
    pub target: Option<ElementId>,
    pub playback_rate: Option<f64>,
    pub enforced: Option<EnforcedSettings>,
    pub resolution: Option<Resolution>,
    pub gain: Option<f32>,
}

/// A built scenario: the tab, its clock and the control surface's inbox.
pub struct SimPage {
    pub tab: Arc<Tab>,
    pub scheduler: Scheduler,
    pub port: Arc<SimPort>,
    documents: Vec<(String, Arc<SimDocument>)>,
}

impl SimPage {
    pub fn document(&self, frame: &str) -> Option<&Arc<SimDocument>> {
        self.documents
            .iter()
            .find(|(name, _)| name == frame)
            .map(|(_, document)| document)
    }

    /// Current state of every frame, in frame order.
    pub fn report(&self) -> Vec<FrameReport> {
        self.tab
            .frames()
            .iter()
            .map(|frame| {
                let agent = frame.agent();
                let target = agent.as_ref().and_then(|agent| agent.target());
                let gain = match (target.as_ref(), self.document(frame.name())) {
                    (Some(target), Some(document)) => document
                        .audio()
                        .and_then(|audio| audio.gain_for(target.id())),
                    _ => None,
                };
                FrameReport {
                    frame: frame.name().to_string(),
                    injected: agent.is_some(),
                    target: target.as_ref().map(|target| target.id()),
                    playback_rate: target.as_ref().map(|target| target.playback_rate()),
                    enforced: agent.as_ref().map(|agent| agent.enforced()),
                    resolution: agent.as_ref().and_then(|agent| agent.resolution()),
                    gain,
                }
            })
            .collect()
    }

    fn schedule(&self, event: &Event) -> Result<(), ScenarioError> {
        let document = match &event.frame {
            Some(name) => self
                .document(name)
                .ok_or_else(|| ScenarioError::UnknownFrame(name.clone()))?,
            None => match self.documents.first() {
                Some((_, document)) => document,
                None => return Err(ScenarioError::UnknownFrame("<first>".to_string())),
            },
        };

        let document = document.clone();
        let scheduler = self.scheduler.clone();
        let event = event.clone();
        self.scheduler
            .set_timeout(Duration::from_millis(event.at_ms), move || {
                perform(&document, &scheduler, &event);
            });
        Ok(())
    }
}

fn perform(document: &Arc<SimDocument>, scheduler: &Scheduler, event: &Event) {
    debug!("scenario event at {}ms: {:?}", event.at_ms, event.action);
    let video = || -> Option<Arc<SimVideo>> {
        let video = document.video(event.video);
        if video.is_none() {
            warn!("scenario event at {}ms: no video #{}", event.at_ms, event.video);
        }
        video
    };

    match &event.action {
        Action::SetRate { rate } => {
            if let Some(video) = video() {
                video.set_playback_rate(*rate);
            }
        }
        Action::ForceRate { rate } => {
            if let Some(video) = video() {
                video.force_playback_rate(*rate);
            }
        }
        Action::ResetRateEvery { period_ms, rate } => {
            if let Some(video) = video() {
                let rate = *rate;
                let weak = Arc::downgrade(&video);
                scheduler.set_interval(Duration::from_millis(*period_ms), move || {
                    if let Some(video) = weak.upgrade() {
                        video.set_playback_rate(rate);
                    }
                });
            }
        }
        Action::LoadSource { width, height } => {
            if let Some(video) = video() {
                video.load_source(Size::new(*width, *height));
            }
        }
        Action::Resize { width, height } => {
            if let Some(video) = video() {
                video.resize(Size::new(*width, *height));
            }
        }
        Action::Play => {
            if let Some(video) = video() {
                video.play();
            }
        }
        Action::Pause => {
            if let Some(video) = video() {
                video.pause();
            }
        }
        Action::Finish => {
            if let Some(video) = video() {
                video.finish();
            }
        }
        Action::InsertVideo { video } => {
            document.insert_video(video);
        }
        Action::InsertPlainNode => document.insert_plain_node(),
        Action::RemoveVideo => {
            if let Some(video) = video() {
                document.remove_video(video.id());
            }
        }
        Action::Navigate { videos } => {
            document.navigate(videos);
        }
        Action::FinishLoading => document.finish_loading(),
        Action::BlockAudio { reason } => {
            if let Some(audio) = document.audio() {
                audio.block(reason);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::{self, MemoryStore};
    use crate::protocol::{Notification, Request};

    const PAGE: &str = r#"{
        "frames": [
            { "name": "top", "videos": [] },
            { "name": "player", "videos": [ { "width": 1280, "height": 720, "playing": true } ] }
        ],
        "events": [
            { "at_ms": 1000, "frame": "player", "action": { "type": "reset_rate_every", "period_ms": 300 } },
            { "at_ms": 2000, "frame": "player", "action": { "type": "load_source", "width": 1920, "height": 1080 } }
        ]
    }"#;

    #[test]
    fn scripted_page_keeps_enforced_speed() {
        let scenario = Scenario::from_json(PAGE).expect("scenario");
        let page = scenario.build().expect("page");
        let store = MemoryStore::new();
        prefs::save_applied(&store, EnforcedSettings { speed: 2.0, volume: 250 }).expect("save");
        page.tab.ensure_injected(&store).expect("inject");

        page.scheduler.advance(Duration::from_millis(3_000));
        page.scheduler.advance(Duration::from_millis(10));

        let report = page.report();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].target, None);
        assert_eq!(report[1].playback_rate, Some(2.0));
        assert_eq!(report[1].gain, Some(2.5));
        assert_eq!(
            page.port.notifications(),
            vec![Notification::ResolutionChanged {
                width: 1920,
                height: 1080
            }]
        );
    }

    #[test]
    fn broadcast_reaches_only_the_video_frame() {
        let page = Scenario::from_json(PAGE).expect("scenario").build().expect("page");
        page.tab.ensure_injected(&MemoryStore::new()).expect("inject");

        let responses = page.tab.responses(&Request::GetState).expect("responses");
        assert_eq!(responses.len(), 1);
    }

    #[test]
    fn unknown_frame_is_rejected() {
        let raw = r#"{ "frames": [ { "name": "top" } ],
                       "events": [ { "at_ms": 0, "frame": "nope", "action": { "type": "play" } } ] }"#;
        let err = Scenario::from_json(raw)
            .expect("scenario")
            .build()
            .err()
            .expect("unknown frame");
        assert!(matches!(err, ScenarioError::UnknownFrame(name) if name == "nope"));
    }

    #[test]
    fn inserted_video_is_picked_up() {
        let raw = r#"{ "frames": [ { "name": "top" } ],
                       "events": [ { "at_ms": 100, "action": { "type": "insert_video",
                                     "video": { "playing": true } } } ] }"#;
        let page = Scenario::from_json(raw).expect("scenario").build().expect("page");
        let store = MemoryStore::new();
        prefs::save_defaults(&store, 1.5, 100.0).expect("save");
        page.tab.ensure_injected(&store).expect("inject");

        page.scheduler.advance(Duration::from_millis(600));
        assert_eq!(page.report()[0].playback_rate, Some(1.5));
    }
}
