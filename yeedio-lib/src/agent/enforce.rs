//! Applying and re-asserting the enforced settings.
//!
//! Host pages fight back in three ways: they write `playbackRate` on their
//! own timers, they answer our write with one of their own from a
//! `ratechange` handler, and they load a new source into the same element,
//! which resets the rate. The periodic enforcement timer, the delayed
//! rate-change correction and the loaded-data re-apply cover one each.

use std::sync::Arc;

use log::{debug, warn};

use crate::constants::UNITY_VOLUME_PERCENT;
use crate::host::{MediaElement, MediaEvent};
use crate::levels::{clamp_speed, clamp_volume, gain_for_volume};

use super::AgentInner;

impl AgentInner {
    /// Apply `speed` and/or `volume` to the current target.
    ///
    /// Without a target this does nothing. A speed restarts the enforcement
    /// timer; a volume only touches the audio graph.
    pub(super) fn apply(self: &Arc<Self>, speed: Option<f64>, volume: Option<f64>) {
        let Some(target) = self.resolve_target() else {
            debug!("no media element to apply settings to");
            return;
        };

        if let Some(requested) = speed {
            match clamp_speed(requested) {
                Some(speed) => self.apply_speed(&target, speed),
                None => warn!("ignoring non-finite speed {}", requested),
            }
        }

        if let Some(requested) = volume {
            match clamp_volume(requested) {
                Some(volume) => self.apply_volume(&target, volume),
                None => warn!("ignoring non-finite volume {}", requested),
            }
        }

        self.watch_resolution(&target);
        self.attach_listeners(&target);
    }

    /// Re-apply the full enforced settings to the current target.
    pub(super) fn reapply(self: &Arc<Self>) {
        let enforced = self.session.lock().unwrap().enforced;
        self.apply(Some(enforced.speed), Some(f64::from(enforced.volume)));
    }

    fn apply_speed(self: &Arc<Self>, target: &Arc<dyn MediaElement>, speed: f64) {
        self.session.lock().unwrap().enforced.speed = speed;
        target.set_playback_rate(speed);
        self.restart_enforcement();
    }

    fn apply_volume(self: &Arc<Self>, target: &Arc<dyn MediaElement>, volume: u16) {
        let initialized = {
            let mut session = self.session.lock().unwrap();
            session.enforced.volume = volume;
            session.elements.audio_initialized(target.id())
        };

        // Unity gain on an element we have never wired needs no graph.
        if volume != UNITY_VOLUME_PERCENT || initialized {
            self.ensure_graph(target);
        }

        let (context, node) = {
            let session = self.session.lock().unwrap();
            (session.audio.clone(), session.elements.gain_node(target.id()))
        };
        if let (Some(context), Some(node)) = (context, node) {
            if let Err(err) = context.set_gain(node, gain_for_volume(volume)) {
                warn!("failed to set gain on {}: {}", target.id(), err);
            }
        }
    }

    /// Cancel the running enforcement timer and start a fresh one.
    fn restart_enforcement(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let mut session = self.session.lock().unwrap();
        if let Some(previous) = session.enforcement.take() {
            self.scheduler.cancel(previous);
        }
        let handle = self
            .scheduler
            .set_interval(self.settings.enforcement_interval(), move || {
                if let Some(agent) = weak.upgrade() {
                    agent.enforce_speed();
                }
            });
        debug!("enforcement timer is now {}", handle);
        session.enforcement = Some(handle);
    }

    /// One enforcement tick: restore the current target's rate on drift.
    fn enforce_speed(&self) {
        let (target, speed) = {
            let session = self.session.lock().unwrap();
            (session.target.clone(), session.enforced.speed)
        };
        if let Some(target) = target {
            if target.playback_rate() != speed {
                debug!(
                    "{} drifted to {}; restoring {}",
                    target.id(),
                    target.playback_rate(),
                    speed
                );
                target.set_playback_rate(speed);
            }
        }
    }

    /// Attach the rate-change and loaded-data listeners once per element.
    fn attach_listeners(self: &Arc<Self>, element: &Arc<dyn MediaElement>) {
        if !self.session.lock().unwrap().elements.mark_listeners(element) {
            return;
        }

        let agent = Arc::downgrade(self);
        let watched = Arc::downgrade(element);
        element.add_listener(
            MediaEvent::RateChange,
            Arc::new(move || {
                if let (Some(agent), Some(element)) = (agent.upgrade(), watched.upgrade()) {
                    agent.on_rate_change(element);
                }
            }),
        );

        let agent = Arc::downgrade(self);
        element.add_listener(
            MediaEvent::LoadedData,
            Arc::new(move || {
                if let Some(agent) = agent.upgrade() {
                    debug!("new media data loaded; re-applying settings");
                    agent.reapply();
                }
            }),
        );
    }

    /// Undo a foreign rate change after a short delay.
    ///
    /// Correcting synchronously would let a page that answers every
    /// `ratechange` with its own write pin both handlers in a loop.
    fn on_rate_change(self: &Arc<Self>, element: Arc<dyn MediaElement>) {
        let speed = self.session.lock().unwrap().enforced.speed;
        if element.playback_rate() == speed {
            return;
        }

        let agent = Arc::downgrade(self);
        let watched = Arc::downgrade(&element);
        self.scheduler
            .set_timeout(self.settings.rate_correction_delay(), move || {
                let (Some(agent), Some(element)) = (agent.upgrade(), watched.upgrade()) else {
                    return;
                };
                let speed = agent.session.lock().unwrap().enforced.speed;
                if element.playback_rate() != speed {
                    debug!("correcting foreign rate change on {}", element.id());
                    element.set_playback_rate(speed);
                }
            });
    }
}
