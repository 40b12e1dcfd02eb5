//! Simulated frame document.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::host::{
    AddedNode, AudioBackend, Document, DocumentState, ElementId, MediaElement, MutationCallback,
    MutationRecord,
};
use crate::timing::Scheduler;

use super::audio::SimAudio;
use super::media::{SimVideo, VideoSpec};

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

fn next_element_id() -> ElementId {
    ElementId(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed))
}

struct DocumentInner {
    state: DocumentState,
    videos: Vec<Arc<SimVideo>>,
    loaded_callbacks: Vec<Box<dyn FnOnce() + Send>>,
    observers: Vec<MutationCallback>,
}

/// In-memory document holding simulated videos.
///
/// Insertions and removals are reported synchronously to body observers as a
/// single mutation record per call.
pub struct SimDocument {
    scheduler: Scheduler,
    audio: Option<Arc<SimAudio>>,
    inner: Mutex<DocumentInner>,
}

impl SimDocument {
    /// A fully loaded document with audio processing available.
    pub fn new(scheduler: &Scheduler) -> Arc<Self> {
        Self::build(scheduler, DocumentState::Complete, Some(SimAudio::new()))
    }

    /// A document still parsing; see [`SimDocument::finish_loading`].
    pub fn loading(scheduler: &Scheduler) -> Arc<Self> {
        Self::build(scheduler, DocumentState::Loading, Some(SimAudio::new()))
    }

    /// A loaded document whose host has no audio processing API.
    pub fn without_audio(scheduler: &Scheduler) -> Arc<Self> {
        Self::build(scheduler, DocumentState::Complete, None)
    }

    fn build(scheduler: &Scheduler, state: DocumentState, audio: Option<Arc<SimAudio>>) -> Arc<Self> {
        Arc::new(Self {
            scheduler: scheduler.clone(),
            audio,
            inner: Mutex::new(DocumentInner {
                state,
                videos: Vec::new(),
                loaded_callbacks: Vec::new(),
                observers: Vec::new(),
            }),
        })
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn audio(&self) -> Option<Arc<SimAudio>> {
        self.audio.clone()
    }

    pub fn videos(&self) -> Vec<Arc<SimVideo>> {
        self.inner.lock().unwrap().videos.clone()
    }

    pub fn video(&self, index: usize) -> Option<Arc<SimVideo>> {
        self.inner.lock().unwrap().videos.get(index).cloned()
    }

    /// Add a video that was part of the initial markup. No mutation is
    /// reported.
    pub fn preload(&self, spec: &VideoSpec) -> Arc<SimVideo> {
        let video = SimVideo::new(next_element_id(), spec, &self.scheduler);
        self.inner.lock().unwrap().videos.push(video.clone());
        video
    }

    /// Insert a single video element.
    pub fn insert_video(&self, spec: &VideoSpec) -> Arc<SimVideo> {
        let video = self.preload(spec);
        self.notify(vec![MutationRecord {
            added_nodes: vec![AddedNode::media()],
        }]);
        video
    }

    /// Put a previously removed video back into the tree, the way a player
    /// moved between containers comes back. Returns `false` if it is still
    /// present.
    pub fn reinsert(&self, video: &Arc<SimVideo>) -> bool {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.videos.iter().any(|present| present.id() == video.id()) {
                return false;
            }
            inner.videos.push(video.clone());
        }
        video.reconnect();
        self.notify(vec![MutationRecord {
            added_nodes: vec![AddedNode::media()],
        }]);
        true
    }

    /// Insert one wrapper node containing `specs.len()` videos.
    pub fn insert_container(&self, specs: &[VideoSpec]) -> Vec<Arc<SimVideo>> {
        let videos: Vec<Arc<SimVideo>> = specs.iter().map(|spec| self.preload(spec)).collect();
        self.notify(vec![MutationRecord {
            added_nodes: vec![AddedNode::container(videos.len())],
        }]);
        videos
    }

    /// Insert a node without media (ads, comments, overlays).
    pub fn insert_plain_node(&self) {
        self.notify(vec![MutationRecord {
            added_nodes: vec![AddedNode::container(0)],
        }]);
    }

    /// Remove a video from the tree. Returns `false` if it was not present.
    pub fn remove_video(&self, id: ElementId) -> bool {
        let removed = {
            let mut inner = self.inner.lock().unwrap();
            let index = inner.videos.iter().position(|video| video.id() == id);
            index.map(|index| inner.videos.remove(index))
        };
        match removed {
            Some(video) => {
                video.disconnect();
                true
            }
            None => false,
        }
    }

    /// Single-page navigation: drop every video and insert the new page's
    /// videos inside one container.
    pub fn navigate(&self, specs: &[VideoSpec]) -> Vec<Arc<SimVideo>> {
        let old = std::mem::take(&mut self.inner.lock().unwrap().videos);
        for video in old {
            video.disconnect();
        }
        self.insert_container(specs)
    }

    /// Leave the loading state and run the deferred content-loaded callbacks.
    pub fn finish_loading(&self) {
        let callbacks = {
            let mut inner = self.inner.lock().unwrap();
            inner.state = DocumentState::Complete;
            std::mem::take(&mut inner.loaded_callbacks)
        };
        for callback in callbacks {
            callback();
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner.lock().unwrap().observers.len()
    }

    fn notify(&self, records: Vec<MutationRecord>) {
        let observers = self.inner.lock().unwrap().observers.clone();
        for observer in observers {
            observer(&records);
        }
    }
}

impl Document for SimDocument {
    fn media_elements(&self) -> Vec<Arc<dyn MediaElement>> {
        self.inner
            .lock()
            .unwrap()
            .videos
            .iter()
            .map(|video| video.clone() as Arc<dyn MediaElement>)
            .collect()
    }

    fn state(&self) -> DocumentState {
        self.inner.lock().unwrap().state
    }

    fn on_content_loaded(&self, callback: Box<dyn FnOnce() + Send>) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == DocumentState::Loading {
            inner.loaded_callbacks.push(callback);
            return;
        }
        drop(inner);
        callback();
    }

    fn observe_body(&self, callback: MutationCallback) {
        self.inner.lock().unwrap().observers.push(callback);
    }

    fn audio_backend(&self) -> Option<Arc<dyn AudioBackend>> {
        self.audio
            .clone()
            .map(|audio| audio as Arc<dyn AudioBackend>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn insertions_are_reported_to_observers() {
        let scheduler = Scheduler::new();
        let document = SimDocument::new(&scheduler);
        let media_batches = Arc::new(AtomicUsize::new(0));
        let counter = media_batches.clone();
        document.observe_body(Arc::new(move |records: &[MutationRecord]| {
            if records.iter().any(MutationRecord::adds_media) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));

        document.insert_plain_node();
        document.insert_video(&VideoSpec::default());
        document.insert_container(&[VideoSpec::default(), VideoSpec::default()]);

        assert_eq!(media_batches.load(Ordering::SeqCst), 2);
        assert_eq!(document.media_elements().len(), 3);
    }

    #[test]
    fn removed_videos_are_disconnected() {
        let scheduler = Scheduler::new();
        let document = SimDocument::new(&scheduler);
        let video = document.preload(&VideoSpec::default());

        assert!(document.remove_video(video.id()));
        assert!(!video.is_connected());
        assert!(document.media_elements().is_empty());
        assert!(!document.remove_video(video.id()));
    }

    #[test]
    fn content_loaded_callbacks_wait_for_loading_to_finish() {
        let scheduler = Scheduler::new();
        let document = SimDocument::loading(&scheduler);
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        document.on_content_loaded(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        document.finish_loading();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(document.state(), DocumentState::Complete);
    }
}
