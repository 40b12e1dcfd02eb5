//! Control-surface logic: what the popup does, without the widgets.

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};

use crate::constants::{DEFAULT_SPEED, SPEED_STEP, UNITY_VOLUME_PERCENT};
use crate::levels::{clamp_speed, clamp_volume, EnforcedSettings};
use crate::prefs::{self, PreferenceStore};
use crate::protocol::{Notification, Request, Resolution, Response};

use super::tab::Tab;

/// Status line shown under the controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Resolution(Resolution),
    LoadingResolution,
    NoVideo,
    CannotAccess,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Resolution(resolution) => write!(f, "Current Resolution: {}", resolution),
            Status::LoadingResolution => write!(f, "Loading Resolution..."),
            Status::NoVideo => write!(f, "No video player found."),
            Status::CannotAccess => write!(f, "CANNOT ACCESS THIS PAGE."),
        }
    }
}

/// Speed and volume controls bound to one tab.
///
/// Every change is persisted as the last applied value and broadcast to the
/// tab's agents. Calls return the status line to display.
pub struct ControlClient {
    tab: Arc<Tab>,
    store: Arc<dyn PreferenceStore>,
    settings: EnforcedSettings,
    status: Status,
}

impl ControlClient {
    pub fn new(tab: Arc<Tab>, store: Arc<dyn PreferenceStore>) -> Self {
        let settings = prefs::load_startup(store.as_ref());
        Self {
            tab,
            store,
            settings,
            status: Status::LoadingResolution,
        }
    }

    pub fn speed(&self) -> f64 {
        self.settings.speed
    }

    pub fn volume(&self) -> u16 {
        self.settings.volume
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Make sure the tab's frames have agents, then pull their state.
    pub fn open(&mut self) -> Status {
        if !self.inject() {
            self.load_fallback();
            return self.status;
        }
        self.refresh()
    }

    /// Ask the tab for the enforced state and mirror it in the controls.
    pub fn refresh(&mut self) -> Status {
        match self.tab.send(&Request::GetState) {
            Ok(Some(Response::State(state))) => {
                self.settings = EnforcedSettings {
                    speed: state.speed,
                    volume: state.volume,
                };
                self.status = match state.resolution {
                    Some(resolution) if resolution.width > 0 => Status::Resolution(resolution),
                    _ => Status::LoadingResolution,
                };
            }
            Ok(_) | Err(_) => {
                self.load_fallback();
                self.status = Status::NoVideo;
            }
        }
        self.status
    }

    /// Set the speed from user input. Unparsable input means 1.0.
    pub fn sync_speed(&mut self, input: &str) -> Status {
        let speed = leading_number(input, true).unwrap_or(DEFAULT_SPEED);
        self.set_speed(speed)
    }

    /// Set the volume percentage from user input. Unparsable input means 100.
    pub fn sync_volume(&mut self, input: &str) -> Status {
        let volume = leading_number(input, false).unwrap_or(f64::from(UNITY_VOLUME_PERCENT));
        self.set_volume(volume)
    }

    /// Nudge the speed by `delta`, as the up and down buttons do.
    pub fn step_speed(&mut self, delta: f64) -> Status {
        self.set_speed(self.settings.speed + delta)
    }

    pub fn speed_up(&mut self) -> Status {
        self.step_speed(SPEED_STEP)
    }

    pub fn speed_down(&mut self) -> Status {
        self.step_speed(-SPEED_STEP)
    }

    /// Return the speed to the stored global default.
    pub fn reset_speed(&mut self) -> Status {
        let defaults = self.global_defaults();
        self.set_speed(defaults.speed)
    }

    /// Return the volume to the stored global default. A stored default of
    /// 0% is honoured; see [`prefs::StoredPreferences::global_defaults`].
    pub fn reset_volume(&mut self) -> Status {
        let defaults = self.global_defaults();
        self.set_volume(f64::from(defaults.volume))
    }

    /// React to an unsolicited agent message.
    pub fn on_notification(&mut self, notification: &Notification) -> Status {
        let Notification::ResolutionChanged { width, height } = *notification;
        if width > 0 {
            self.status = Status::Resolution(Resolution { width, height });
        }
        self.status
    }

    pub fn set_speed(&mut self, speed: f64) -> Status {
        self.settings.speed = clamp_speed(speed).unwrap_or(DEFAULT_SPEED);
        self.save_and_apply()
    }

    pub fn set_volume(&mut self, volume: f64) -> Status {
        self.settings.volume = clamp_volume(volume).unwrap_or(UNITY_VOLUME_PERCENT);
        self.save_and_apply()
    }

    fn save_and_apply(&mut self) -> Status {
        if let Err(err) = prefs::save_applied(self.store.as_ref(), self.settings) {
            warn!("failed to save preferences: {}", err);
        }
        if !self.inject() {
            return self.status;
        }

        let request = Request::UpdateSettings {
            speed: Some(self.settings.speed),
            volume: Some(f64::from(self.settings.volume)),
        };
        match self.tab.send(&request) {
            Ok(Some(response)) => {
                if let Some(resolution) = response.resolution() {
                    self.status = Status::Resolution(resolution);
                }
            }
            Ok(None) => self.status = Status::NoVideo,
            Err(err) => {
                debug!("update not delivered: {}", err);
                self.status = Status::NoVideo;
            }
        }
        self.status
    }

    /// Inject agents where missing. On failure the status becomes
    /// [`Status::CannotAccess`].
    fn inject(&mut self) -> bool {
        match self.tab.ensure_injected(self.store.as_ref()) {
            Ok(_) => true,
            Err(err) => {
                debug!("cannot reach page: {}", err);
                self.status = Status::CannotAccess;
                false
            }
        }
    }

    /// Show the stored values when no agent can report them.
    fn load_fallback(&mut self) {
        self.settings = prefs::load_startup(self.store.as_ref());
    }

    fn global_defaults(&self) -> EnforcedSettings {
        match prefs::load(self.store.as_ref()) {
            Ok(stored) => stored.global_defaults(),
            Err(err) => {
                warn!("failed to read global defaults: {}", err);
                EnforcedSettings::default()
            }
        }
    }
}

/// Parse the numeric prefix of `input`, the way form fields are read:
/// `"1.5x"` is 1.5 and `"150%"` is 150. Fractions are dropped unless
/// `fraction` is set.
fn leading_number(input: &str, fraction: bool) -> Option<f64> {
    let input = input.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_point = false;
    for (index, ch) in input.char_indices() {
        match ch {
            '+' | '-' if index == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if fraction && !seen_point => seen_point = true,
            _ => break,
        }
        end = index + ch.len_utf8();
    }
    if !seen_digit {
        return None;
    }
    input[..end].parse().ok()
}
