//! Message routing across the frames of one page.

use std::sync::Arc;

use log::{debug, warn};

use crate::host::HostError;
use crate::prefs::PreferenceStore;
use crate::protocol::{Request, Response};
use crate::timing::Scheduler;

use super::frame::Frame;

/// A browser tab: a scheduler and the frames of the page it shows.
#[derive(Debug)]
pub struct Tab {
    scheduler: Scheduler,
    frames: Vec<Arc<Frame>>,
    restricted: Option<String>,
}

impl Tab {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            frames: Vec::new(),
            restricted: None,
        }
    }

    /// A tab whose page refuses script injection, such as a browser
    /// settings page.
    pub fn restricted(scheduler: Scheduler, reason: &str) -> Self {
        Self {
            restricted: Some(reason.to_string()),
            ..Self::new(scheduler)
        }
    }

    pub fn add_frame(&mut self, frame: Frame) -> Arc<Frame> {
        let frame = Arc::new(frame);
        self.frames.push(frame.clone());
        frame
    }

    pub fn frames(&self) -> &[Arc<Frame>] {
        &self.frames
    }

    pub fn frame(&self, name: &str) -> Option<&Arc<Frame>> {
        self.frames.iter().find(|frame| frame.name() == name)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn is_restricted(&self) -> bool {
        self.restricted.is_some()
    }

    /// Inject an agent into every frame that lacks one.
    ///
    /// Returns how many frames were newly injected.
    pub fn ensure_injected(&self, store: &dyn PreferenceStore) -> Result<usize, HostError> {
        if let Some(reason) = &self.restricted {
            warn!("injection refused: {}", reason);
            return Err(HostError::Blocked(reason.clone()));
        }
        let mut injected = 0;
        for frame in self.frames.iter().filter(|frame| !frame.is_injected()) {
            frame.inject(store);
            injected += 1;
        }
        Ok(injected)
    }

    /// Broadcast `request` to every frame and return the first reply.
    ///
    /// Fails with [`HostError::Disconnected`] when no frame has an agent to
    /// receive it. Every agent still processes the request.
    pub fn send(&self, request: &Request) -> Result<Option<Response>, HostError> {
        Ok(self.responses(request)?.into_iter().next())
    }

    /// Broadcast `request` and collect every reply in frame order.
    pub fn responses(&self, request: &Request) -> Result<Vec<Response>, HostError> {
        let receivers: Vec<&Arc<Frame>> = self
            .frames
            .iter()
            .filter(|frame| frame.is_injected())
            .collect();
        if receivers.is_empty() {
            return Err(HostError::Disconnected);
        }

        let responses: Vec<Response> = receivers
            .into_iter()
            .filter_map(|frame| frame.deliver(request))
            .collect();
        debug!("{:?} answered by {} frame(s)", request, responses.len());
        Ok(responses)
    }
}
