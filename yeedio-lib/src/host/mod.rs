//! Seams between the agent and the page it runs in.
//!
//! A browser binding implements these traits over the real DOM, Web Audio and
//! extension messaging. [`sim`] implements them in memory.

pub mod error;
pub mod sim;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::protocol::Notification;

pub use error::HostError;

/// Stable identity of a media element within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "media#{}", self.0)
    }
}

/// `HTMLMediaElement.readyState`, ordered from least to most data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

/// Media element events the agent subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaEvent {
    Play,
    RateChange,
    LoadedData,
    LoadedMetadata,
    Resize,
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Event listener registered on a media element.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// A video or audio element owned by the document.
pub trait MediaElement: Send + Sync {
    fn id(&self) -> ElementId;
    /// False once the element has been removed from its document.
    fn is_connected(&self) -> bool;
    fn is_paused(&self) -> bool;
    fn is_ended(&self) -> bool;
    fn ready_state(&self) -> ReadyState;
    /// Rendered size on the page.
    fn client_size(&self) -> Size;
    /// Intrinsic size of the loaded media (`videoWidth`/`videoHeight`).
    fn intrinsic_size(&self) -> Size;
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&self, rate: f64);
    fn add_listener(&self, event: MediaEvent, listener: Listener);
}

/// `document.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    Loading,
    Interactive,
    Complete,
}

/// One node inserted into the observed subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddedNode {
    pub is_media: bool,
    pub media_descendants: usize,
}

impl AddedNode {
    pub fn media() -> Self {
        Self {
            is_media: true,
            media_descendants: 0,
        }
    }

    pub fn container(media_descendants: usize) -> Self {
        Self {
            is_media: false,
            media_descendants,
        }
    }

    /// The node is a media element or contains one.
    pub fn holds_media(&self) -> bool {
        self.is_media || self.media_descendants > 0
    }
}

/// One batch entry delivered to a mutation observer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MutationRecord {
    pub added_nodes: Vec<AddedNode>,
}

impl MutationRecord {
    pub fn adds_media(&self) -> bool {
        self.added_nodes.iter().any(AddedNode::holds_media)
    }
}

/// Callback receiving a batch of mutation records.
pub type MutationCallback = Arc<dyn Fn(&[MutationRecord]) + Send + Sync>;

/// The document of one frame.
pub trait Document: Send + Sync {
    /// All media elements currently in the document, in tree order.
    fn media_elements(&self) -> Vec<Arc<dyn MediaElement>>;
    fn state(&self) -> DocumentState;
    /// Run `callback` once the document stops loading.
    fn on_content_loaded(&self, callback: Box<dyn FnOnce() + Send>);
    /// Observe child-list changes across the body subtree.
    fn observe_body(&self, callback: MutationCallback);
    /// Audio processing for this document, `None` when unsupported.
    fn audio_backend(&self) -> Option<Arc<dyn AudioBackend>>;
}

/// Identity of a node in an audio graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Where an audio node's output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioTarget {
    Node(NodeId),
    Destination,
}

/// `AudioContext.state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

/// Factory for audio contexts.
pub trait AudioBackend: Send + Sync {
    fn create_context(&self) -> Result<Arc<dyn AudioContext>, HostError>;
}

/// An audio processing graph bound to the output device.
pub trait AudioContext: Send + Sync {
    fn state(&self) -> ContextState;
    fn resume(&self) -> Result<(), HostError>;
    fn create_gain(&self) -> Result<NodeId, HostError>;
    /// Route an element's audio through this graph.
    ///
    /// Fails if the element already feeds a source node.
    fn create_media_source(&self, element: &dyn MediaElement) -> Result<NodeId, HostError>;
    fn connect(&self, from: NodeId, to: AudioTarget) -> Result<(), HostError>;
    fn set_gain(&self, node: NodeId, value: f32) -> Result<(), HostError>;
}

/// Outbound, best-effort channel to the control surface.
pub trait NotificationPort: Send + Sync {
    fn send(&self, notification: &Notification) -> Result<(), HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn added_nodes_report_media() {
        assert!(AddedNode::media().holds_media());
        assert!(AddedNode::container(2).holds_media());
        assert!(!AddedNode::container(0).holds_media());
    }

    #[test]
    fn mutation_record_adds_media_if_any_node_does() {
        let record = MutationRecord {
            added_nodes: vec![AddedNode::container(0), AddedNode::container(1)],
        };
        assert!(record.adds_media());
        assert!(!MutationRecord::default().adds_media());
    }

    #[test]
    fn ready_states_are_ordered() {
        assert!(ReadyState::HaveFutureData > ReadyState::HaveCurrentData);
        assert!(ReadyState::HaveMetadata < ReadyState::HaveCurrentData);
    }
}
