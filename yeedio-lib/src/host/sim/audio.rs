//! Simulated audio processing graph.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::host::{
    AudioBackend, AudioContext, AudioTarget, ContextState, ElementId, HostError, MediaElement,
    NodeId,
};

#[derive(Debug, Default)]
struct SimGraph {
    next_node: u64,
    gains: BTreeMap<NodeId, f32>,
    sources: BTreeMap<NodeId, ElementId>,
    wired: HashMap<ElementId, NodeId>,
    edges: Vec<(NodeId, AudioTarget)>,
}

impl SimGraph {
    fn alloc(&mut self) -> NodeId {
        self.next_node += 1;
        NodeId(self.next_node)
    }

    fn contains(&self, node: NodeId) -> bool {
        self.gains.contains_key(&node) || self.sources.contains_key(&node)
    }
}

/// Audio backend for a simulated document.
///
/// Like the browser, it refuses to create a second source node for an element
/// that already feeds one, whichever context created the first.
pub struct SimAudio {
    graph: Arc<Mutex<SimGraph>>,
    contexts: Mutex<Vec<Arc<SimAudioContext>>>,
    blocked: Mutex<Option<String>>,
}

impl SimAudio {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            graph: Arc::new(Mutex::new(SimGraph::default())),
            contexts: Mutex::new(Vec::new()),
            blocked: Mutex::new(None),
        })
    }

    /// Make every later context creation fail with `reason`.
    pub fn block(&self, reason: &str) {
        *self.blocked.lock().unwrap() = Some(reason.to_string());
    }

    pub fn contexts_created(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }

    /// The first context created, if any.
    pub fn context(&self) -> Option<Arc<SimAudioContext>> {
        self.contexts.lock().unwrap().first().cloned()
    }

    pub fn gain_node_count(&self) -> usize {
        self.graph.lock().unwrap().gains.len()
    }

    pub fn source_node_count(&self) -> usize {
        self.graph.lock().unwrap().sources.len()
    }

    /// Gain applied to `element`'s audio, following source → gain → output.
    pub fn gain_for(&self, element: ElementId) -> Option<f32> {
        let graph = self.graph.lock().unwrap();
        let source = graph.wired.get(&element)?;
        let gain_node = graph.edges.iter().find_map(|(from, to)| match to {
            AudioTarget::Node(node) if from == source => Some(*node),
            _ => None,
        })?;
        let routed = graph
            .edges
            .iter()
            .any(|(from, to)| *from == gain_node && *to == AudioTarget::Destination);
        if !routed {
            return None;
        }
        graph.gains.get(&gain_node).copied()
    }
}

impl AudioBackend for SimAudio {
    fn create_context(&self) -> Result<Arc<dyn AudioContext>, HostError> {
        if let Some(reason) = self.blocked.lock().unwrap().clone() {
            return Err(HostError::Blocked(reason));
        }
        let context = Arc::new(SimAudioContext {
            graph: self.graph.clone(),
            state: Mutex::new(ContextState::Suspended),
            resumes: AtomicUsize::new(0),
        });
        self.contexts.lock().unwrap().push(context.clone());
        Ok(context)
    }
}

/// Context handed out by [`SimAudio`]. Starts suspended, as under an
/// autoplay policy.
pub struct SimAudioContext {
    graph: Arc<Mutex<SimGraph>>,
    state: Mutex<ContextState>,
    resumes: AtomicUsize,
}

impl SimAudioContext {
    pub fn resume_count(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    pub fn close(&self) {
        *self.state.lock().unwrap() = ContextState::Closed;
    }
}

impl AudioContext for SimAudioContext {
    fn state(&self) -> ContextState {
        *self.state.lock().unwrap()
    }

    fn resume(&self) -> Result<(), HostError> {
        let mut state = self.state.lock().unwrap();
        if *state == ContextState::Closed {
            return Err(HostError::InvalidState("context is closed".to_string()));
        }
        self.resumes.fetch_add(1, Ordering::SeqCst);
        *state = ContextState::Running;
        Ok(())
    }

    fn create_gain(&self) -> Result<NodeId, HostError> {
        let mut graph = self.graph.lock().unwrap();
        let node = graph.alloc();
        graph.gains.insert(node, 1.0);
        Ok(node)
    }

    fn create_media_source(&self, element: &dyn MediaElement) -> Result<NodeId, HostError> {
        let mut graph = self.graph.lock().unwrap();
        if graph.wired.contains_key(&element.id()) {
            return Err(HostError::InvalidState(format!(
                "{} is already connected to a media source node",
                element.id()
            )));
        }
        let node = graph.alloc();
        graph.sources.insert(node, element.id());
        graph.wired.insert(element.id(), node);
        Ok(node)
    }

    fn connect(&self, from: NodeId, to: AudioTarget) -> Result<(), HostError> {
        let mut graph = self.graph.lock().unwrap();
        if !graph.contains(from) {
            return Err(HostError::InvalidState(format!("unknown node {:?}", from)));
        }
        if let AudioTarget::Node(node) = to {
            if !graph.gains.contains_key(&node) {
                return Err(HostError::InvalidState(format!("cannot connect to {:?}", node)));
            }
        }
        graph.edges.push((from, to));
        Ok(())
    }

    fn set_gain(&self, node: NodeId, value: f32) -> Result<(), HostError> {
        let mut graph = self.graph.lock().unwrap();
        match graph.gains.get_mut(&node) {
            Some(gain) => {
                *gain = value;
                Ok(())
            }
            None => Err(HostError::InvalidState(format!("{:?} is not a gain node", node))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::sim::{SimDocument, VideoSpec};
    use crate::timing::Scheduler;

    #[test]
    fn second_source_for_same_element_fails() {
        let scheduler = Scheduler::new();
        let document = SimDocument::new(&scheduler);
        let video = document.preload(&VideoSpec::default());
        let audio = document.audio().expect("audio");
        let context = audio.create_context().expect("context");

        assert!(context.create_media_source(video.as_ref()).is_ok());
        let err = context
            .create_media_source(video.as_ref())
            .expect_err("second source must fail");
        assert!(matches!(err, HostError::InvalidState(_)));
    }

    #[test]
    fn gain_is_reported_only_when_routed_to_output() {
        let scheduler = Scheduler::new();
        let document = SimDocument::new(&scheduler);
        let video = document.preload(&VideoSpec::default());
        let audio = document.audio().expect("audio");
        let context = audio.create_context().expect("context");

        let gain = context.create_gain().expect("gain");
        let source = context.create_media_source(video.as_ref()).expect("source");
        context.connect(source, AudioTarget::Node(gain)).expect("connect");
        assert_eq!(audio.gain_for(video.id()), None);

        context.connect(gain, AudioTarget::Destination).expect("connect");
        context.set_gain(gain, 2.5).expect("set gain");
        assert_eq!(audio.gain_for(video.id()), Some(2.5));
    }

    #[test]
    fn blocked_backend_refuses_contexts() {
        let audio = SimAudio::new();
        audio.block("autoplay policy");
        assert!(matches!(audio.create_context(), Err(HostError::Blocked(_))));
        assert_eq!(audio.contexts_created(), 0);
    }

    #[test]
    fn contexts_start_suspended_and_resume() {
        let audio = SimAudio::new();
        audio.create_context().expect("context");
        let context = audio.context().expect("context");
        assert_eq!(context.state(), ContextState::Suspended);
        context.resume().expect("resume");
        assert_eq!(context.state(), ContextState::Running);
        assert_eq!(context.resume_count(), 1);
    }
}
