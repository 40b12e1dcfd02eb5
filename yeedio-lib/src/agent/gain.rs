//! One-time audio graph for gain above unity.

use std::sync::Arc;

use log::{debug, error};

use crate::host::{AudioContext, AudioTarget, ContextState, HostError, MediaElement, MediaEvent, NodeId};

use super::AgentInner;

impl AgentInner {
    /// Route `element` through a gain node of the shared audio context.
    ///
    /// Runs at most once per element. Failures leave the agent in speed-only
    /// mode for that element.
    pub(super) fn ensure_graph(self: &Arc<Self>, element: &Arc<dyn MediaElement>) {
        let state = self.session.lock().unwrap().elements.get(element.id());
        if state.audio_initialized || state.audio_failed {
            return;
        }
        let Some(backend) = self.document.audio_backend() else {
            debug!("audio processing unavailable; gain stays at unity");
            return;
        };

        let context = match self.shared_context(|| backend.create_context()) {
            Ok(context) => context,
            Err(err) => {
                error!("failed to create audio context: {}", err);
                return;
            }
        };

        match build_graph(context.as_ref(), element.as_ref()) {
            Ok(gain) => {
                self.session
                    .lock()
                    .unwrap()
                    .elements
                    .mark_audio(element, gain);
                debug!("{} routed through gain {:?}", element.id(), gain);
                resume_on_play(element.as_ref(), context);
            }
            Err(err) => {
                error!("failed to build audio graph for {}: {}", element.id(), err);
                self.session
                    .lock()
                    .unwrap()
                    .elements
                    .mark_audio_failed(element);
            }
        }
    }

    /// The frame's audio context, created on first use.
    fn shared_context<F>(&self, create: F) -> Result<Arc<dyn AudioContext>, HostError>
    where
        F: FnOnce() -> Result<Arc<dyn AudioContext>, HostError>,
    {
        if let Some(context) = self.session.lock().unwrap().audio.clone() {
            return Ok(context);
        }
        let context = create()?;
        let mut session = self.session.lock().unwrap();
        Ok(session.audio.get_or_insert(context).clone())
    }
}

fn resume_on_play(element: &dyn MediaElement, context: Arc<dyn AudioContext>) {
    let weak = Arc::downgrade(&context);
    element.add_listener(
        MediaEvent::Play,
        Arc::new(move || {
            let Some(context) = weak.upgrade() else {
                return;
            };
            if context.state() == ContextState::Suspended {
                if let Err(err) = context.resume() {
                    debug!("audio context did not resume: {}", err);
                }
            }
        }),
    );
}

fn build_graph(context: &dyn AudioContext, element: &dyn MediaElement) -> Result<NodeId, HostError> {
    let source = context.create_media_source(element)?;
    let gain = context.create_gain()?;
    context.connect(source, AudioTarget::Node(gain))?;
    context.connect(gain, AudioTarget::Destination)?;
    Ok(gain)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::testing::Fixture;
    use crate::host::sim::VideoSpec;
    use crate::host::{AudioBackend, AudioContext, ContextState, MediaElement};

    #[test]
    fn graph_is_built_once_per_element() {
        let fixture = Fixture::with_video(VideoSpec::sized(640, 360).playing());
        fixture.agent.apply(None, Some(250.0));
        fixture.agent.apply(None, Some(400.0));

        let audio = fixture.audio();
        assert_eq!(audio.gain_node_count(), 1);
        assert_eq!(audio.source_node_count(), 1);
        assert_eq!(audio.contexts_created(), 1);
        assert_eq!(fixture.gain_for(&fixture.video(0)), Some(4.0));
    }

    #[test]
    fn unity_volume_on_fresh_element_builds_nothing() {
        let fixture = Fixture::with_video(VideoSpec::sized(640, 360).playing());
        fixture.agent.apply(None, Some(100.0));

        assert_eq!(fixture.audio().contexts_created(), 0);
        assert!(!fixture.agent.element_state(fixture.video(0).id()).audio_initialized);
    }

    #[test]
    fn returning_to_unity_keeps_the_graph_in_use() {
        let fixture = Fixture::with_video(VideoSpec::sized(640, 360).playing());
        fixture.agent.apply(None, Some(300.0));
        fixture.agent.apply(None, Some(100.0));

        assert_eq!(fixture.gain_for(&fixture.video(0)), Some(1.0));
    }

    #[test]
    fn blocked_audio_degrades_to_speed_only() {
        let fixture = Fixture::with_video(VideoSpec::sized(640, 360).playing());
        fixture.audio().block("not allowed to start");

        fixture.agent.apply(Some(2.0), Some(300.0));
        let video = fixture.video(0);
        assert_eq!(video.playback_rate(), 2.0);
        assert_eq!(fixture.agent.enforced().volume, 300);
        assert!(!fixture.agent.element_state(video.id()).audio_initialized);
    }

    #[test]
    fn element_wired_by_someone_else_degrades() {
        let fixture = Fixture::with_video(VideoSpec::sized(640, 360).playing());
        let video = fixture.video(0);
        let foreign = fixture.audio().create_context().expect("context");
        foreign
            .create_media_source(video.as_ref())
            .expect("page source node");

        fixture.agent.apply(Some(1.5), Some(200.0));
        assert_eq!(video.playback_rate(), 1.5);
        let state = fixture.agent.element_state(video.id());
        assert!(!state.audio_initialized);
        assert!(state.audio_failed);
    }

    #[test]
    fn failed_graph_is_not_retried() {
        let fixture = Fixture::with_video(VideoSpec::sized(640, 360).playing());
        let video = fixture.video(0);
        let foreign = fixture.audio().create_context().expect("context");
        foreign
            .create_media_source(video.as_ref())
            .expect("page source node");

        fixture.agent.apply(None, Some(200.0));
        fixture.agent.apply(None, Some(300.0));
        video.load_source(crate::host::Size::new(1280, 720));
        fixture.scheduler.advance(Duration::ZERO);

        let audio = fixture.audio();
        assert_eq!(audio.gain_node_count(), 0);
        assert_eq!(audio.source_node_count(), 1);
        assert_eq!(fixture.agent.enforced().volume, 300);
    }

    #[test]
    fn missing_audio_backend_is_silent() {
        let fixture = Fixture::without_audio(VideoSpec::sized(640, 360).playing());
        fixture.agent.apply(Some(1.25), Some(500.0));

        assert_eq!(fixture.video(0).playback_rate(), 1.25);
        assert_eq!(fixture.agent.enforced().volume, 500);
    }

    #[test]
    fn play_resumes_suspended_context() {
        let fixture = Fixture::with_video(VideoSpec::sized(640, 360));
        fixture.agent.apply(None, Some(200.0));
        let context = fixture.audio().context().expect("context");
        assert_eq!(context.state(), ContextState::Suspended);

        fixture.video(0).play();
        fixture.scheduler.advance(Duration::ZERO);
        assert_eq!(context.state(), ContextState::Running);
        assert_eq!(context.resume_count(), 1);
    }

    #[test]
    fn context_is_shared_across_elements() {
        let fixture = Fixture::with_videos(&[
            VideoSpec::sized(1280, 720).playing(),
            VideoSpec::sized(320, 180),
        ]);
        fixture.agent.apply(None, Some(300.0));

        fixture.document.remove_video(fixture.video(0).id());
        fixture.agent.apply(None, Some(300.0));

        let audio = fixture.audio();
        assert_eq!(audio.contexts_created(), 1);
        assert_eq!(audio.gain_node_count(), 2);
    }
}
