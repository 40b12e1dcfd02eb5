//! Rediscovery after media is inserted into the page.

use std::sync::Arc;

use log::debug;

use crate::host::MutationRecord;

use super::AgentInner;

impl AgentInner {
    pub(super) fn install_watcher(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.document
            .observe_body(Arc::new(move |records: &[MutationRecord]| {
                if let Some(agent) = weak.upgrade() {
                    agent.on_mutations(records);
                }
            }));
    }

    fn on_mutations(self: &Arc<Self>, records: &[MutationRecord]) {
        if !records.iter().any(MutationRecord::adds_media) {
            return;
        }

        let weak = Arc::downgrade(self);
        let scheduled = self
            .session
            .lock()
            .unwrap()
            .rediscovery
            .trigger(&self.scheduler, move || {
                if let Some(agent) = weak.upgrade() {
                    agent.rediscover();
                }
            });
        if scheduled {
            debug!("media inserted; rediscovery in {:?}", self.settings.rediscovery_delay());
        }
    }

    /// Drop state of destroyed elements, pick a new target and apply the
    /// enforced settings to it.
    fn rediscover(self: &Arc<Self>) {
        let pruned = self.session.lock().unwrap().elements.prune();
        if pruned > 0 {
            debug!("forgot {} destroyed media element(s)", pruned);
        }
        if self.relocate().is_some() {
            self.reapply();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::testing::Fixture;
    use crate::host::sim::VideoSpec;
    use crate::host::{MediaElement, MediaEvent, Size};
    use crate::levels::EnforcedSettings;

    fn started(fixture: &Fixture, speed: f64, volume: u16) {
        fixture.agent.start(EnforcedSettings { speed, volume });
    }

    #[test]
    fn inserted_video_receives_startup_settings() {
        let fixture = Fixture::empty();
        started(&fixture, 1.75, 100);
        assert!(fixture.agent.target().is_none());

        let video = fixture
            .document
            .insert_video(&VideoSpec::sized(1280, 720).playing());
        fixture.scheduler.advance(Duration::from_millis(499));
        assert_eq!(video.playback_rate(), 1.0);

        fixture.scheduler.advance(Duration::from_millis(1));
        assert_eq!(video.playback_rate(), 1.75);
        assert_eq!(fixture.agent.target().map(|target| target.id()), Some(video.id()));
    }

    #[test]
    fn burst_of_insertions_triggers_one_rediscovery() {
        let fixture = Fixture::empty();
        started(&fixture, 2.0, 100);

        for _ in 0..5 {
            fixture.document.insert_video(&VideoSpec::sized(320, 180));
            fixture.scheduler.advance(Duration::from_millis(50));
        }
        assert!(fixture.agent.rediscovery_pending());

        fixture.scheduler.advance(Duration::from_millis(250));
        assert!(!fixture.agent.rediscovery_pending());
        let rate_writes: usize = fixture
            .document
            .videos()
            .iter()
            .map(|video| video.rate_writes())
            .sum();
        assert_eq!(rate_writes, 1);
    }

    #[test]
    fn nodes_without_media_are_ignored() {
        let fixture = Fixture::empty();
        started(&fixture, 2.0, 100);

        fixture.document.insert_plain_node();
        assert!(!fixture.agent.rediscovery_pending());
        assert_eq!(fixture.scheduler.live_timers(), 0);
    }

    #[test]
    fn single_page_navigation_moves_enforcement() {
        let fixture = Fixture::with_video(VideoSpec::sized(640, 360).playing());
        started(&fixture, 2.5, 300);
        let old = fixture.video(0);
        assert_eq!(old.playback_rate(), 2.5);

        let new = fixture
            .document
            .navigate(&[VideoSpec::sized(1280, 720).playing()])
            .remove(0);
        fixture.scheduler.advance(Duration::from_millis(500));

        assert_eq!(fixture.agent.target().map(|target| target.id()), Some(new.id()));
        assert_eq!(new.playback_rate(), 2.5);
        assert_eq!(fixture.gain_for(&new), Some(3.0));
        assert!(!old.is_connected());
    }

    #[test]
    fn reinserted_element_keeps_its_graph_and_listeners() {
        let fixture = Fixture::with_video(VideoSpec::sized(640, 360).playing());
        started(&fixture, 1.0, 300);
        let player = fixture.video(0);

        fixture.document.remove_video(player.id());
        let other = fixture
            .document
            .insert_video(&VideoSpec::sized(320, 180).playing());
        fixture.scheduler.advance(Duration::from_millis(500));
        assert_eq!(fixture.agent.target().map(|target| target.id()), Some(other.id()));

        fixture.document.remove_video(other.id());
        assert!(fixture.document.reinsert(&player));
        fixture.scheduler.advance(Duration::from_millis(500));
        assert_eq!(fixture.agent.target().map(|target| target.id()), Some(player.id()));

        fixture.agent.apply(None, Some(100.0));
        let state = fixture.agent.element_state(player.id());
        assert!(state.audio_initialized);
        assert_eq!(fixture.gain_for(&player), Some(1.0));
        assert_eq!(fixture.audio().source_node_count(), 2);
        assert_eq!(player.listener_count(MediaEvent::RateChange), 1);
        assert_eq!(player.listener_count(MediaEvent::LoadedMetadata), 1);
    }

    #[test]
    fn rediscovery_uses_latest_enforced_settings() {
        let fixture = Fixture::with_video(VideoSpec::sized(640, 360).playing());
        started(&fixture, 1.0, 100);
        fixture.agent.apply(Some(3.0), None);

        let inserted = fixture
            .document
            .insert_video(&VideoSpec::sized(1920, 1080).playing());
        inserted.set_intrinsic_size(Size::new(1920, 1080));
        fixture.scheduler.advance(Duration::from_millis(500));

        assert_eq!(inserted.playback_rate(), 3.0);
    }
}
