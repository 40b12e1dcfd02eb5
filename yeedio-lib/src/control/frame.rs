//! One document context of a page and its injected agent.

use std::sync::{Arc, Mutex};

use log::{debug, info};

use crate::agent::{AgentSettings, FrameAgent};
use crate::host::{Document, NotificationPort};
use crate::prefs::{self, PreferenceStore};
use crate::protocol::{Request, Response};
use crate::timing::Scheduler;

/// A frame of a tab: the top-level document or an iframe.
pub struct Frame {
    name: String,
    document: Arc<dyn Document>,
    scheduler: Scheduler,
    port: Arc<dyn NotificationPort>,
    settings: AgentSettings,
    agent: Mutex<Option<FrameAgent>>,
}

impl Frame {
    pub fn new(
        name: &str,
        document: Arc<dyn Document>,
        scheduler: Scheduler,
        port: Arc<dyn NotificationPort>,
    ) -> Self {
        Self {
            name: name.to_string(),
            document,
            scheduler,
            port,
            settings: AgentSettings::default(),
            agent: Mutex::new(None),
        }
    }

    /// Timing used by agents injected from now on.
    pub fn with_settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&self) -> &Arc<dyn Document> {
        &self.document
    }

    pub fn agent(&self) -> Option<FrameAgent> {
        self.agent.lock().unwrap().clone()
    }

    pub fn is_injected(&self) -> bool {
        self.agent.lock().unwrap().is_some()
    }

    /// Install and start an agent, reading its startup settings from
    /// `store`. A frame only ever gets one agent; later calls return it.
    pub fn inject(&self, store: &dyn PreferenceStore) -> FrameAgent {
        let agent = {
            let mut slot = self.agent.lock().unwrap();
            if let Some(agent) = slot.as_ref() {
                debug!("frame {} already has an agent", self.name);
                return agent.clone();
            }
            let agent = FrameAgent::with_settings(
                self.document.clone(),
                self.scheduler.clone(),
                self.port.clone(),
                self.settings,
            );
            *slot = Some(agent.clone());
            agent
        };

        info!("injecting agent into frame {}", self.name);
        agent.start(prefs::load_startup(store));
        agent
    }

    /// Hand `request` to this frame's agent, if it has one.
    pub fn deliver(&self, request: &Request) -> Option<Response> {
        self.agent().and_then(|agent| agent.handle(request))
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("name", &self.name)
            .field("injected", &self.is_injected())
            .finish()
    }
}
