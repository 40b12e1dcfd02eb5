//! Per-frame enforcement agent.
//!
//! A [`FrameAgent`] is the session object for one document: it owns the
//! enforced settings, the element side table, the shared audio context and the
//! enforcement timer. Behaviour is split by concern:
//! - [`locator`] picks the media element to manage.
//! - [`gain`] builds the one-time audio graph used for gain above unity.
//! - [`enforce`] applies settings and re-asserts them against the host page.
//! - [`resolution`] reports intrinsic size changes to the control surface.
//! - [`watcher`] reruns discovery when the page inserts new media.
//! - [`gateway`] answers control-surface requests.

mod enforce;
mod gain;
mod gateway;
pub mod locator;
mod resolution;
pub mod settings;
pub mod table;
#[cfg(test)]
mod testing;
mod watcher;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::host::{AudioContext, Document, ElementId, MediaElement, NotificationPort};
use crate::levels::EnforcedSettings;
use crate::protocol::Resolution;
use crate::timing::{Debouncer, Scheduler, TimerHandle};

pub use resolution::current_resolution;
pub use settings::AgentSettings;
pub use table::{ElementState, ElementTable};

/// Mutable agent state. Locked briefly; never held across host calls.
struct Session {
    target: Option<Arc<dyn MediaElement>>,
    enforced: EnforcedSettings,
    elements: ElementTable,
    audio: Option<Arc<dyn AudioContext>>,
    enforcement: Option<TimerHandle>,
    rediscovery: Debouncer,
}

struct AgentInner {
    document: Arc<dyn Document>,
    scheduler: Scheduler,
    port: Arc<dyn NotificationPort>,
    settings: AgentSettings,
    session: Mutex<Session>,
    started: AtomicBool,
}

/// Enforcement agent for one frame.
///
/// Cloning shares the agent. Listeners and timers it registers hold it weakly,
/// so dropping every clone stops all enforcement.
#[derive(Clone)]
pub struct FrameAgent {
    inner: Arc<AgentInner>,
}

impl FrameAgent {
    /// Create an agent with default timing.
    pub fn new(
        document: Arc<dyn Document>,
        scheduler: Scheduler,
        port: Arc<dyn NotificationPort>,
    ) -> Self {
        Self::with_settings(document, scheduler, port, AgentSettings::default())
    }

    /// Create an agent with explicit timing settings.
    pub fn with_settings(
        document: Arc<dyn Document>,
        scheduler: Scheduler,
        port: Arc<dyn NotificationPort>,
        settings: AgentSettings,
    ) -> Self {
        let session = Session {
            target: None,
            enforced: EnforcedSettings::default(),
            elements: ElementTable::new(),
            audio: None,
            enforcement: None,
            rediscovery: Debouncer::new(settings.rediscovery_delay()),
        };

        Self {
            inner: Arc::new(AgentInner {
                document,
                scheduler,
                port,
                settings,
                session: Mutex::new(session),
                started: AtomicBool::new(false),
            }),
        }
    }

    /// Seed the enforced settings, apply them once the document has loaded,
    /// and start watching for inserted media.
    ///
    /// The startup values are kept even when no media element exists yet, so
    /// that a video inserted later receives them.
    pub fn start(&self, startup: EnforcedSettings) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            warn!("agent already started; ignoring second start");
            return;
        }
        info!(
            "starting agent with speed {} and volume {}%",
            startup.speed, startup.volume
        );

        let startup = EnforcedSettings::clamped(startup.speed, f64::from(startup.volume));
        self.inner.session.lock().unwrap().enforced = startup;

        let weak = Arc::downgrade(&self.inner);
        self.inner.document.on_content_loaded(Box::new(move || {
            if let Some(agent) = weak.upgrade() {
                agent.reapply();
            }
        }));

        self.inner.install_watcher();
    }

    /// Apply new settings to the current target. Absent values are left as
    /// they are.
    pub fn apply(&self, speed: Option<f64>, volume: Option<f64>) {
        self.inner.apply(speed, volume);
    }

    /// The agent's desired speed and volume.
    pub fn enforced(&self) -> EnforcedSettings {
        self.inner.session.lock().unwrap().enforced
    }

    /// The element currently under management, if any.
    pub fn target(&self) -> Option<Arc<dyn MediaElement>> {
        self.inner.session.lock().unwrap().target.clone()
    }

    /// Resolution of the current target.
    pub fn resolution(&self) -> Option<Resolution> {
        self.target()
            .and_then(|target| current_resolution(target.as_ref()))
    }

    /// Side-table state recorded for `id`.
    pub fn element_state(&self, id: ElementId) -> ElementState {
        self.inner.session.lock().unwrap().elements.get(id)
    }

    /// Forget all per-element state without touching the elements.
    pub fn clear_element_state(&self) {
        self.inner.session.lock().unwrap().elements.clear();
    }

    /// Handle of the live enforcement timer.
    pub fn enforcement_timer(&self) -> Option<TimerHandle> {
        let handle = self.inner.session.lock().unwrap().enforcement;
        handle.filter(|handle| self.inner.scheduler.is_live(*handle))
    }

    /// True while a mutation-triggered rediscovery is waiting to run.
    pub fn rediscovery_pending(&self) -> bool {
        let session = self.inner.session.lock().unwrap();
        session.rediscovery.is_pending(&self.inner.scheduler)
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.inner.settings
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }
}

impl AgentInner {
    /// Cached target if still attached to the document, else a fresh lookup.
    fn resolve_target(&self) -> Option<Arc<dyn MediaElement>> {
        let cached = self.session.lock().unwrap().target.clone();
        match cached {
            Some(target) if target.is_connected() => Some(target),
            _ => self.relocate(),
        }
    }

    /// Run discovery and store the result as the current target.
    fn relocate(&self) -> Option<Arc<dyn MediaElement>> {
        let located = locator::locate(self.document.as_ref());
        let previous = {
            let mut session = self.session.lock().unwrap();
            std::mem::replace(&mut session.target, located.clone())
        };

        let previous_id = previous.map(|element| element.id());
        let located_id = located.as_ref().map(|element| element.id());
        if located_id != previous_id {
            match located_id {
                Some(id) => info!("managing {}", id),
                None => info!("no media element in frame"),
            }
        }
        located
    }
}

impl std::fmt::Debug for FrameAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.inner.session.lock().unwrap();
        f.debug_struct("FrameAgent")
            .field("target", &session.target.as_ref().map(|target| target.id()))
            .field("enforced", &session.enforced)
            .field("elements", &session.elements.len())
            .field("enforcement", &session.enforcement)
            .finish()
    }
}

