//! Shared test fixture: one simulated frame with an agent attached.

use std::sync::Arc;

use crate::host::sim::{SimAudio, SimDocument, SimPort, SimVideo, VideoSpec};
use crate::host::MediaElement;
use crate::timing::Scheduler;

use super::FrameAgent;

pub(super) struct Fixture {
    pub scheduler: Scheduler,
    pub document: Arc<SimDocument>,
    pub port: Arc<SimPort>,
    pub agent: FrameAgent,
}

impl Fixture {
    pub fn empty() -> Self {
        let scheduler = Scheduler::new();
        let document = SimDocument::new(&scheduler);
        Self::attach(scheduler, document)
    }

    pub fn with_video(spec: VideoSpec) -> Self {
        Self::with_videos(&[spec])
    }

    pub fn with_videos(specs: &[VideoSpec]) -> Self {
        let fixture = Self::empty();
        for spec in specs {
            fixture.document.preload(spec);
        }
        fixture
    }

    pub fn without_audio(spec: VideoSpec) -> Self {
        let scheduler = Scheduler::new();
        let document = SimDocument::without_audio(&scheduler);
        document.preload(&spec);
        Self::attach(scheduler, document)
    }

    fn attach(scheduler: Scheduler, document: Arc<SimDocument>) -> Self {
        let port = SimPort::new();
        let agent = FrameAgent::new(document.clone(), scheduler.clone(), port.clone());
        Self {
            scheduler,
            document,
            port,
            agent,
        }
    }

    pub fn video(&self, index: usize) -> Arc<SimVideo> {
        self.document.video(index).expect("video in fixture document")
    }

    pub fn audio(&self) -> Arc<SimAudio> {
        self.document.audio().expect("fixture document has audio")
    }

    pub fn gain_for(&self, video: &SimVideo) -> Option<f32> {
        self.audio().gain_for(video.id())
    }
}
