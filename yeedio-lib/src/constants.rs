//! Shared bounds and timing defaults for the enforcement agent.

/// Slowest playback rate the agent will enforce.
pub const MIN_SPEED: f64 = 0.25;

/// Fastest playback rate the agent will enforce.
///
/// Media elements accept higher rates, but most decoders stall well before
/// that point.
pub const MAX_SPEED: f64 = 16.0;

/// Playback rate used when nothing has been stored.
pub const DEFAULT_SPEED: f64 = 1.0;

/// Increment used by the control surface's step buttons.
pub const SPEED_STEP: f64 = 0.25;

/// Lowest volume percentage (silence).
pub const MIN_VOLUME_PERCENT: u16 = 0;

/// Highest volume percentage, a 6x gain multiplier.
pub const MAX_VOLUME_PERCENT: u16 = 600;

/// Volume percentage that maps to unity gain.
pub const UNITY_VOLUME_PERCENT: u16 = 100;

/// Period of the drift enforcement timer (ms).
pub const ENFORCEMENT_INTERVAL_MS: u64 = 500;

/// Delay before undoing an external playback-rate change (ms).
pub const RATE_CORRECTION_DELAY_MS: u64 = 10;

/// Delay between a media insertion and the rediscovery it triggers (ms).
pub const REDISCOVERY_DELAY_MS: u64 = 500;
