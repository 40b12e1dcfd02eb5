use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    ENFORCEMENT_INTERVAL_MS, RATE_CORRECTION_DELAY_MS, REDISCOVERY_DELAY_MS,
};

/// Timing knobs for a frame agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Period of the drift enforcement timer.
    pub enforcement_interval_ms: u64,
    /// Delay before undoing an external playback-rate change.
    pub rate_correction_delay_ms: u64,
    /// Delay between a media insertion and rediscovery.
    pub rediscovery_delay_ms: u64,
}

impl AgentSettings {
    /// Configure the drift enforcement period (ms). Clamped to at least 1 ms.
    pub fn set_enforcement_interval_ms(&mut self, ms: u64) {
        self.enforcement_interval_ms = ms.max(1);
    }

    /// Configure the rate-change correction delay (ms).
    pub fn set_rate_correction_delay_ms(&mut self, ms: u64) {
        self.rate_correction_delay_ms = ms;
    }

    /// Configure the rediscovery delay after DOM insertions (ms).
    pub fn set_rediscovery_delay_ms(&mut self, ms: u64) {
        self.rediscovery_delay_ms = ms;
    }

    pub fn enforcement_interval(&self) -> Duration {
        Duration::from_millis(self.enforcement_interval_ms.max(1))
    }

    pub fn rate_correction_delay(&self) -> Duration {
        Duration::from_millis(self.rate_correction_delay_ms)
    }

    pub fn rediscovery_delay(&self) -> Duration {
        Duration::from_millis(self.rediscovery_delay_ms)
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            enforcement_interval_ms: ENFORCEMENT_INTERVAL_MS,
            rate_correction_delay_ms: RATE_CORRECTION_DELAY_MS,
            rediscovery_delay_ms: REDISCOVERY_DELAY_MS,
        }
    }
}
