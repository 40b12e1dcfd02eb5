//! Timer plumbing for the agent.
//!
//! - [`scheduler`] is the single-threaded timer queue every callback runs on.
//! - [`debounce`] coalesces bursts of triggers into one delayed run.

pub mod debounce;
pub mod scheduler;

pub use debounce::Debouncer;
pub use scheduler::{Scheduler, TimerHandle};
