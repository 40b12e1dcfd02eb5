//! Deterministic in-memory host.
//!
//! Element events are queued on a [`Scheduler`](crate::timing::Scheduler) the
//! way a browser queues them as tasks, so a test drives the whole page by
//! advancing virtual time.

mod audio;
mod document;
mod media;
mod port;

pub use audio::{SimAudio, SimAudioContext};
pub use document::SimDocument;
pub use media::{SimVideo, VideoSpec};
pub use port::SimPort;
