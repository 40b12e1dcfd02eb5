//! Inbound requests from the control surface.

use std::sync::Arc;

use log::debug;

use crate::protocol::{Request, Response, StateResponse, UpdateResponse};

use super::{current_resolution, AgentInner, FrameAgent};

impl FrameAgent {
    /// Answer `request`, or stay silent when this frame has no media element.
    pub fn handle(&self, request: &Request) -> Option<Response> {
        self.inner.handle(request)
    }

    /// [`FrameAgent::handle`] over JSON text. Malformed or unknown requests
    /// get no reply.
    pub fn handle_json(&self, raw: &str) -> Option<String> {
        let request: Request = match serde_json::from_str(raw) {
            Ok(request) => request,
            Err(err) => {
                debug!("ignoring unrecognised message: {}", err);
                return None;
            }
        };
        let response = self.handle(&request)?;
        match serde_json::to_string(&response) {
            Ok(json) => Some(json),
            Err(err) => {
                debug!("failed to encode response: {}", err);
                None
            }
        }
    }
}

impl AgentInner {
    fn handle(self: &Arc<Self>, request: &Request) -> Option<Response> {
        let target = self.relocate()?;

        match request {
            Request::UpdateSettings { speed, volume } => {
                self.apply(*speed, *volume);
                Some(Response::Updated(UpdateResponse {
                    success: true,
                    resolution: current_resolution(target.as_ref()),
                }))
            }
            Request::GetState => {
                let enforced = self.session.lock().unwrap().enforced;
                Some(Response::State(StateResponse {
                    speed: enforced.speed,
                    volume: enforced.volume,
                    resolution: current_resolution(target.as_ref()),
                }))
            }
        }
    }
}
