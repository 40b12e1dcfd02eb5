//! Wire types exchanged between a frame agent and the control surface.
//!
//! Requests and notifications are JSON objects tagged by `"type"`. Responses
//! carry no tag; the control surface knows which request it sent.

use serde::{Deserialize, Serialize};

/// Intrinsic dimensions of the media currently loaded in an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Control surface to agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    UpdateSettings {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speed: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        volume: Option<f64>,
    },
    GetState,
}

/// Reply to [`Request::UpdateSettings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub resolution: Option<Resolution>,
}

/// Reply to [`Request::GetState`].
///
/// `speed` is the enforced value, not the live playback rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateResponse {
    pub speed: f64,
    pub volume: u16,
    pub resolution: Option<Resolution>,
}

/// Agent to control surface reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Updated(UpdateResponse),
    State(StateResponse),
}

impl Response {
    pub fn resolution(&self) -> Option<Resolution> {
        match self {
            Response::Updated(update) => update.resolution,
            Response::State(state) => state.resolution,
        }
    }
}

/// Unsolicited agent to control surface message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    ResolutionChanged { width: u32, height: u32 },
}
