//! Stored user preferences.
//!
//! Four keys are shared between the agent, the control surface and the
//! options page: the last applied `speed` and `volume`, and the
//! `globalDefaultSpeed`/`globalDefaultVolume` pair used when nothing has been
//! applied yet.

pub mod error;
pub mod store;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::levels::EnforcedSettings;

pub use error::PrefsError;
pub use store::{JsonFileStore, MemoryStore, PreferenceStore};

pub const SPEED_KEY: &str = "speed";
pub const VOLUME_KEY: &str = "volume";
pub const GLOBAL_DEFAULT_SPEED_KEY: &str = "globalDefaultSpeed";
pub const GLOBAL_DEFAULT_VOLUME_KEY: &str = "globalDefaultVolume";

const ALL_KEYS: [&str; 4] = [
    SPEED_KEY,
    VOLUME_KEY,
    GLOBAL_DEFAULT_SPEED_KEY,
    GLOBAL_DEFAULT_VOLUME_KEY,
];

/// The preference keys as stored. Values that are not numbers read as absent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_default_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_default_volume: Option<f64>,
}

impl StoredPreferences {
    pub fn from_map(values: &Map<String, Value>) -> Self {
        let number = |key: &str| values.get(key).and_then(Value::as_f64);
        Self {
            speed: number(SPEED_KEY),
            volume: number(VOLUME_KEY),
            global_default_speed: number(GLOBAL_DEFAULT_SPEED_KEY),
            global_default_volume: number(GLOBAL_DEFAULT_VOLUME_KEY),
        }
    }

    /// Settings a freshly injected agent starts with: the last applied
    /// values, else the global defaults, else 1.0 and 100%.
    pub fn startup(&self) -> EnforcedSettings {
        let fallback = self.global_defaults();
        EnforcedSettings::clamped(
            self.speed.unwrap_or(fallback.speed),
            self.volume.unwrap_or(f64::from(fallback.volume)),
        )
    }

    /// The options-page defaults, 1.0 and 100% when unset.
    ///
    /// Only a missing key falls back. A stored default volume of `0` stays a
    /// muted default rather than reading as 100%, so the options page can
    /// save a silent default.
    pub fn global_defaults(&self) -> EnforcedSettings {
        let defaults = EnforcedSettings::default();
        EnforcedSettings::clamped(
            self.global_default_speed.unwrap_or(defaults.speed),
            self.global_default_volume
                .unwrap_or(f64::from(defaults.volume)),
        )
    }
}

/// Read every preference key from `store`.
pub fn load(store: &dyn PreferenceStore) -> Result<StoredPreferences, PrefsError> {
    let values = store.get(&ALL_KEYS)?;
    Ok(StoredPreferences::from_map(&values))
}

/// Startup settings from `store`. A store that cannot be read yields the
/// defaults.
pub fn load_startup(store: &dyn PreferenceStore) -> EnforcedSettings {
    match load(store) {
        Ok(stored) => stored.startup(),
        Err(err) => {
            warn!("failed to read preferences, using defaults: {}", err);
            EnforcedSettings::default()
        }
    }
}

/// Persist the settings last applied from the control surface.
pub fn save_applied(store: &dyn PreferenceStore, settings: EnforcedSettings) -> Result<(), PrefsError> {
    let settings = EnforcedSettings::clamped(settings.speed, f64::from(settings.volume));
    let mut values = Map::new();
    values.insert(SPEED_KEY.to_string(), Value::from(settings.speed));
    values.insert(VOLUME_KEY.to_string(), Value::from(settings.volume));
    store.set(values)
}

/// Persist new global defaults and seed the applied values with them.
///
/// Returns the clamped defaults that were written.
pub fn save_defaults(
    store: &dyn PreferenceStore,
    speed: f64,
    volume: f64,
) -> Result<EnforcedSettings, PrefsError> {
    let defaults = EnforcedSettings::clamped(speed, volume);
    let mut values = Map::new();
    values.insert(GLOBAL_DEFAULT_SPEED_KEY.to_string(), Value::from(defaults.speed));
    values.insert(GLOBAL_DEFAULT_VOLUME_KEY.to_string(), Value::from(defaults.volume));
    values.insert(SPEED_KEY.to_string(), Value::from(defaults.speed));
    values.insert(VOLUME_KEY.to_string(), Value::from(defaults.volume));
    store.set(values)?;
    Ok(defaults)
}
