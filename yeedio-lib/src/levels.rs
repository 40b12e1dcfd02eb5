//! Speed and volume bounds.
//!
//! Every value that reaches the agent, whether from storage, a control-surface
//! command or an options page, passes through these helpers before it is
//! stored or applied.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_SPEED, MAX_SPEED, MAX_VOLUME_PERCENT, MIN_SPEED, MIN_VOLUME_PERCENT,
    UNITY_VOLUME_PERCENT,
};

/// Clamp a requested playback rate into the supported range.
///
/// Returns `None` for non-finite input so callers can drop the field instead
/// of enforcing `NaN`.
pub fn clamp_speed(speed: f64) -> Option<f64> {
    if !speed.is_finite() {
        return None;
    }
    Some(speed.clamp(MIN_SPEED, MAX_SPEED))
}

/// Clamp a requested volume percentage into the supported range.
///
/// Fractional percentages are rounded to the nearest integer.
pub fn clamp_volume(volume: f64) -> Option<u16> {
    if !volume.is_finite() {
        return None;
    }
    let clamped = volume.round().clamp(
        f64::from(MIN_VOLUME_PERCENT),
        f64::from(MAX_VOLUME_PERCENT),
    );
    Some(clamped as u16)
}

/// Convert a volume percentage into a linear gain multiplier.
pub fn gain_for_volume(volume: u16) -> f32 {
    f32::from(volume) / 100.0
}

/// Desired speed and volume for a frame, independent of any media element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnforcedSettings {
    pub speed: f64,
    pub volume: u16,
}

impl EnforcedSettings {
    /// Build settings from raw values, clamping both.
    ///
    /// Non-finite values fall back to the defaults.
    pub fn clamped(speed: f64, volume: f64) -> Self {
        Self {
            speed: clamp_speed(speed).unwrap_or(DEFAULT_SPEED),
            volume: clamp_volume(volume).unwrap_or(UNITY_VOLUME_PERCENT),
        }
    }

    /// Linear gain multiplier for the enforced volume.
    pub fn gain(&self) -> f32 {
        gain_for_volume(self.volume)
    }
}

impl Default for EnforcedSettings {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            volume: UNITY_VOLUME_PERCENT,
        }
    }
}
