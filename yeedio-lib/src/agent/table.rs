//! Per-element idempotency side table.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use crate::host::{ElementId, MediaElement, NodeId};

/// What the agent has already done to one media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElementState {
    /// A source → gain → output chain exists for the element. It can never be
    /// rebuilt for the same element.
    pub audio_initialized: bool,
    /// Building the chain failed after the element may have been claimed by
    /// a source node. No further attempts are made.
    pub audio_failed: bool,
    pub listeners_attached: bool,
    pub resolution_watcher_attached: bool,
    pub gain_node: Option<NodeId>,
}

struct Entry {
    element: Weak<dyn MediaElement>,
    state: ElementState,
}

/// Element state keyed by element identity.
///
/// Entries hold the element weakly, so they can be pruned once the document
/// has destroyed the element. A detached element keeps its entry: the page
/// may insert it again and its source node still exists.
#[derive(Default)]
pub struct ElementTable {
    entries: HashMap<ElementId, Entry>,
}

impl ElementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// State recorded for `id`, or the blank state for unknown elements.
    pub fn get(&self, id: ElementId) -> ElementState {
        self.entries
            .get(&id)
            .map(|entry| entry.state)
            .unwrap_or_default()
    }

    pub fn audio_initialized(&self, id: ElementId) -> bool {
        self.get(id).audio_initialized
    }

    pub fn gain_node(&self, id: ElementId) -> Option<NodeId> {
        self.get(id).gain_node
    }

    /// Record a finished audio graph for `element`.
    pub fn mark_audio(&mut self, element: &Arc<dyn MediaElement>, gain_node: NodeId) {
        let state = self.entry(element);
        state.audio_initialized = true;
        state.gain_node = Some(gain_node);
    }

    pub fn mark_audio_failed(&mut self, element: &Arc<dyn MediaElement>) {
        self.entry(element).audio_failed = true;
    }

    /// Mark listeners attached. Returns `false` if they already were.
    pub fn mark_listeners(&mut self, element: &Arc<dyn MediaElement>) -> bool {
        let state = self.entry(element);
        !std::mem::replace(&mut state.listeners_attached, true)
    }

    /// Mark the resolution watcher attached. Returns `false` if it already was.
    pub fn mark_resolution_watcher(&mut self, element: &Arc<dyn MediaElement>) -> bool {
        let state = self.entry(element);
        !std::mem::replace(&mut state.resolution_watcher_attached, true)
    }

    /// Drop entries whose element was destroyed. Returns how many went.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.element.strong_count() > 0);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn entry(&mut self, element: &Arc<dyn MediaElement>) -> &mut ElementState {
        &mut self
            .entries
            .entry(element.id())
            .or_insert_with(|| Entry {
                element: Arc::downgrade(element),
                state: ElementState::default(),
            })
            .state
    }
}
