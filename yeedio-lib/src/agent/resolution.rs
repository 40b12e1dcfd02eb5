//! Reporting of intrinsic resolution changes.

use std::sync::Arc;

use log::debug;

use crate::host::{MediaElement, MediaEvent};
use crate::protocol::{Notification, Resolution};

use super::AgentInner;

/// Intrinsic size of `element`, once metadata has been loaded.
pub fn current_resolution(element: &dyn MediaElement) -> Option<Resolution> {
    let size = element.intrinsic_size();
    if size.width > 0 && size.height > 0 {
        Some(Resolution {
            width: size.width,
            height: size.height,
        })
    } else {
        None
    }
}

impl AgentInner {
    /// Subscribe to metadata and resize events of `element`, once.
    pub(super) fn watch_resolution(self: &Arc<Self>, element: &Arc<dyn MediaElement>) {
        if !self
            .session
            .lock()
            .unwrap()
            .elements
            .mark_resolution_watcher(element)
        {
            return;
        }

        for event in [MediaEvent::LoadedMetadata, MediaEvent::Resize] {
            let agent = Arc::downgrade(self);
            let watched = Arc::downgrade(element);
            element.add_listener(
                event,
                Arc::new(move || {
                    if let (Some(agent), Some(element)) = (agent.upgrade(), watched.upgrade()) {
                        agent.report_resolution(element.as_ref());
                    }
                }),
            );
        }
    }

    fn report_resolution(&self, element: &dyn MediaElement) {
        let Some(resolution) = current_resolution(element) else {
            return;
        };
        let notification = Notification::ResolutionChanged {
            width: resolution.width,
            height: resolution.height,
        };
        if let Err(err) = self.port.send(&notification) {
            debug!("resolution {} not delivered: {}", resolution, err);
        }
    }
}
