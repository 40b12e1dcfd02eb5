use std::fmt::{Display, Formatter};

/// Error type for host-side operations: audio graph construction, messaging
/// and injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host does not provide the requested API.
    Unsupported(String),
    /// The operation is invalid for the object's current state, e.g. wiring
    /// a media element that already feeds an audio graph.
    InvalidState(String),
    /// The host refused the operation (autoplay policy, restricted page).
    Blocked(String),
    /// The receiving end of a message channel is gone.
    Disconnected,
}

impl Display for HostError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported(what) => write!(f, "unsupported: {}", what),
            Self::InvalidState(err) => write!(f, "invalid state: {}", err),
            Self::Blocked(err) => write!(f, "blocked: {}", err),
            Self::Disconnected => write!(f, "receiving end does not exist"),
        }
    }
}

impl std::error::Error for HostError {}
