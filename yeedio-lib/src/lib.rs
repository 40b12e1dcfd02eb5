//! # Yeedio Library
//!
//! In-page enforcement agent for playback speed and audio gain on web media
//! elements. The agent discovers the most relevant media element in a frame,
//! applies the user's speed and volume, keeps them enforced against host pages
//! that reset them, and answers the control surface over a small message
//! protocol.
//!
//! The agent never talks to a browser directly. It runs against the seams in
//! [`host`], and [`host::sim`] provides a deterministic in-memory page used by
//! the tests and the command line driver.

pub mod agent;
pub mod constants;
pub mod control;
pub mod host;
pub mod levels;
pub mod prefs;
pub mod protocol;
pub mod scenario;
pub mod timing;
