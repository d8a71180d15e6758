//! Configuration management for timeup.
//!
//! The configuration file holds two sections:
//!
//! - **`settings`**: the user-facing tracking settings that the host can also
//!   push at runtime (`updateSettings`). Serialized in camelCase, exactly as
//!   they travel over the bridge.
//! - **`timing`**: engine cadences and deadlines. Rarely changed; edited by hand.
//!
//! The file is stored as pretty-printed JSON in the platform data directory:
//!
//! - **Windows**: `%LOCALAPPDATA%\lacodda\timeup\config.json`
//! - **macOS**: `~/Library/Application Support/lacodda/timeup/config.json`
//! - **Linux**: `~/.local/share/lacodda/timeup/config.json`
//!
//! ## Loading
//!
//! Settings that fail validation are replaced by the defaults, and timing
//! values are clamped into their accepted ranges. A file that is not valid
//! JSON falls back to the defaults entirely. Either way a warning is logged
//! and the engine starts.
//!
//! ## Settings updates
//!
//! Runtime updates are partial: every field of [`SettingsUpdate`] is optional
//! and merged onto the current [`Settings`]. A merged result that fails
//! validation is rejected as a whole and the previous settings stay in effect.
//!
//! ```rust,no_run
//! use timeup::libs::config::{Config, SettingsUpdate};
//!
//! let config = Config::read()?;
//! let update = SettingsUpdate { idle_threshold: Some(90), ..Default::default() };
//! let settings = config.settings.merge(&update)?;
//! assert_eq!(settings.idle_threshold, 90);
//! # Ok::<(), anyhow::Error>(())
//! ```

use super::data_storage::DataStorage;
use crate::libs::messages::Message;
use crate::msg_print;
use anyhow::Result;
use chrono::TimeDelta;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::libs::idle::Thresholds;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Accepted range for the normal idle threshold, in seconds.
pub const IDLE_THRESHOLD_RANGE: RangeInclusive<u64> = 10..=300;

/// Upper bound for the media idle threshold, in seconds.
pub const MAX_MEDIA_IDLE_THRESHOLD: u64 = 14_400;

pub const POLL_INTERVAL_RANGE: RangeInclusive<u64> = 100..=3_600_000;
pub const SAVE_INTERVAL_RANGE: RangeInclusive<u64> = 1..=3_600;
pub const PROBE_TIMEOUT_RANGE: RangeInclusive<u64> = 50..=60_000;
pub const PROBE_GRACE_RANGE: RangeInclusive<u64> = 0..=86_400;
pub const NOTIFICATION_COOLDOWN_RANGE: RangeInclusive<u64> = 0..=604_800;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Idle threshold must be between 10-300 seconds, got {0}")]
    IdleThresholdOutOfRange(u64),
    #[error("Media idle threshold must not exceed 14400 seconds, got {0}")]
    MediaThresholdOutOfRange(u64),
    #[error("Media idle threshold cannot be less than idle threshold")]
    MediaThresholdBelowIdle,
    #[error("malformed settings: {0}")]
    Malformed(String),
}

/// Tracking settings, shared with the host as the configuration input.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Whether limit alerts are delivered at all.
    pub notifications_enabled: bool,
    /// With detection off the session never goes idle.
    pub idle_detection_enabled: bool,
    /// Seconds without activity before the session goes idle.
    pub idle_threshold: u64,
    /// Seconds without activity before the session goes idle while media plays.
    pub media_idle_threshold: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            notifications_enabled: true,
            idle_detection_enabled: true,
            idle_threshold: 60,
            media_idle_threshold: 1800,
        }
    }
}

/// Partial settings as pushed by the host. Missing fields keep their current value.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub notifications_enabled: Option<bool>,
    pub idle_detection_enabled: Option<bool>,
    pub idle_threshold: Option<u64>,
    pub media_idle_threshold: Option<u64>,
}

impl SettingsUpdate {
    /// Parses a raw JSON update. Unknown fields are ignored, wrong types are not.
    pub fn from_value(value: serde_json::Value) -> Result<Self, SettingsError> {
        serde_json::from_value(value).map_err(|e| SettingsError::Malformed(e.to_string()))
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !IDLE_THRESHOLD_RANGE.contains(&self.idle_threshold) {
            return Err(SettingsError::IdleThresholdOutOfRange(self.idle_threshold));
        }
        if self.media_idle_threshold > MAX_MEDIA_IDLE_THRESHOLD {
            return Err(SettingsError::MediaThresholdOutOfRange(self.media_idle_threshold));
        }
        if self.media_idle_threshold < self.idle_threshold {
            return Err(SettingsError::MediaThresholdBelowIdle);
        }
        Ok(())
    }

    /// Returns the merged settings, or the reason they were rejected.
    pub fn merge(&self, update: &SettingsUpdate) -> Result<Settings, SettingsError> {
        let merged = Settings {
            notifications_enabled: update.notifications_enabled.unwrap_or(self.notifications_enabled),
            idle_detection_enabled: update.idle_detection_enabled.unwrap_or(self.idle_detection_enabled),
            idle_threshold: update.idle_threshold.unwrap_or(self.idle_threshold),
            media_idle_threshold: update.media_idle_threshold.unwrap_or(self.media_idle_threshold),
        };
        merged.validate()?;
        Ok(merged)
    }

    pub fn thresholds(&self, probe_grace: Duration) -> Thresholds {
        Thresholds {
            idle: seconds(self.idle_threshold),
            media: seconds(self.media_idle_threshold),
            probe_grace: TimeDelta::from_std(probe_grace).unwrap_or(TimeDelta::MAX),
        }
    }
}

/// Whole seconds as a [`TimeDelta`], saturating at chrono's bounds.
fn seconds(value: u64) -> TimeDelta {
    i64::try_from(value).ok().and_then(TimeDelta::try_seconds).unwrap_or(TimeDelta::MAX)
}

fn clamp(value: u64, range: &RangeInclusive<u64>) -> u64 {
    value.clamp(*range.start(), *range.end())
}

/// Engine cadences and deadlines.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    /// Idle polling and active-tab reconciliation cadence, in milliseconds.
    pub poll_interval: u64,
    /// Periodic flush cadence, in seconds.
    pub save_interval: u64,
    /// Deadline for one page probe or host query, in milliseconds.
    pub probe_timeout: u64,
    /// Seconds without a valid page sample before silence counts toward idleness.
    pub probe_grace: u64,
    /// Minimum seconds between two alerts for the same domain and period.
    pub notification_cooldown: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            poll_interval: 5000,
            save_interval: 5,
            probe_timeout: 500,
            probe_grace: 30,
            notification_cooldown: 3600,
        }
    }
}

impl TimingConfig {
    pub fn poll_every(&self) -> Duration {
        Duration::from_millis(self.poll_interval.max(1))
    }

    pub fn save_every(&self) -> Duration {
        Duration::from_secs(self.save_interval.max(1))
    }

    pub fn probe_deadline(&self) -> Duration {
        Duration::from_millis(self.probe_timeout)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.probe_grace)
    }

    pub fn cooldown(&self) -> TimeDelta {
        seconds(self.notification_cooldown)
    }

    /// Returns a copy with every value pulled into its accepted range.
    pub fn clamped(&self) -> TimingConfig {
        TimingConfig {
            poll_interval: clamp(self.poll_interval, &POLL_INTERVAL_RANGE),
            save_interval: clamp(self.save_interval, &SAVE_INTERVAL_RANGE),
            probe_timeout: clamp(self.probe_timeout, &PROBE_TIMEOUT_RANGE),
            probe_grace: clamp(self.probe_grace, &PROBE_GRACE_RANGE),
            notification_cooldown: clamp(self.notification_cooldown, &NOTIFICATION_COOLDOWN_RANGE),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub timing: TimingConfig,
}

impl Config {
    /// Reads the configuration from the data directory, falling back to defaults
    /// when no file exists yet.
    pub fn read() -> Result<Config> {
        let config_file_path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;
        Self::read_from(&config_file_path)
    }

    /// Reads the configuration at `path`.
    ///
    /// Unusable content never fails the read: invalid settings are replaced by
    /// the defaults and out-of-range timing values are clamped.
    pub fn read_from(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let config_str = fs::read_to_string(path)?;
        let config: Config = match serde_json::from_str(&config_str) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}", Message::ConfigMalformed(e.to_string()));
                return Ok(Config::default());
            }
        };
        Ok(config.sanitized())
    }

    /// Falls back to default settings when they fail validation and clamps timing.
    pub fn sanitized(self) -> Config {
        let settings = match self.settings.validate() {
            Ok(()) => self.settings,
            Err(e) => {
                tracing::warn!("{}", Message::ConfigSettingsInvalid(e.to_string()));
                Settings::default()
            }
        };
        let timing = self.timing.clamped();
        if timing != self.timing {
            tracing::warn!("{}", Message::ConfigTimingClamped);
        }
        Config { settings, timing }
    }

    pub fn save(&self) -> Result<()> {
        let config_file_path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;
        self.save_to(&config_file_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let config_file = File::create(path)?;
        serde_json::to_writer_pretty(&config_file, &self)?;
        Ok(())
    }

    /// Runs the interactive settings wizard, pre-filled with the current values.
    ///
    /// Invalid answers are re-asked until the settings validate.
    pub fn init() -> Result<Self> {
        let mut config = Self::read().unwrap_or_default();
        let current = config.settings;
        msg_print!(Message::ConfigModuleSettings);

        let notifications_enabled = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(Message::PromptNotificationsEnabled.to_string())
            .default(current.notifications_enabled)
            .interact()?;

        let idle_detection_enabled = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(Message::PromptIdleDetectionEnabled.to_string())
            .default(current.idle_detection_enabled)
            .interact()?;

        let idle_threshold: u64 = Input::with_theme(&ColorfulTheme::default())
            .with_prompt(Message::PromptIdleThreshold.to_string())
            .default(current.idle_threshold)
            .validate_with(|value: &u64| -> Result<(), String> {
                if IDLE_THRESHOLD_RANGE.contains(value) {
                    Ok(())
                } else {
                    Err(SettingsError::IdleThresholdOutOfRange(*value).to_string())
                }
            })
            .interact_text()?;

        let media_idle_threshold: u64 = Input::with_theme(&ColorfulTheme::default())
            .with_prompt(Message::PromptMediaIdleThreshold.to_string())
            .default(current.media_idle_threshold.max(idle_threshold))
            .validate_with(|value: &u64| -> Result<(), String> {
                if *value < idle_threshold {
                    Err(SettingsError::MediaThresholdBelowIdle.to_string())
                } else if *value > MAX_MEDIA_IDLE_THRESHOLD {
                    Err(SettingsError::MediaThresholdOutOfRange(*value).to_string())
                } else {
                    Ok(())
                }
            })
            .interact_text()?;

        config.settings = Settings {
            notifications_enabled,
            idle_detection_enabled,
            idle_threshold,
            media_idle_threshold,
        };
        config.settings.validate()?;

        Ok(config)
    }
}
