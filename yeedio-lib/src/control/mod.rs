//! The extension side of the agent: frames and tabs that agents are injected
//! into, and the control surface that talks to them.

pub mod client;
pub mod frame;
pub mod tab;

pub use client::{ControlClient, Status};
pub use frame::Frame;
pub use tab::Tab;
