//! Display implementation for timeup application messages.
//!
//! All user-facing text is defined here so that engine code only deals with
//! typed `Message` values. Engine diagnostics and CLI output both go through
//! this single `Display` impl.

use super::types::Message;
use std::fmt::{Display, Formatter, Result};

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let text = match self {
            // === SESSION MESSAGES ===
            Message::SessionStarted(domain) => format!("Started session for {}", domain),
            Message::SessionEnded(domain) => format!("Ended session for {}", domain),
            Message::SessionRejected(reason) => format!("Not tracking this tab: {}", reason),
            Message::SessionTabMismatch(domain) => format!("Active tab changed behind the session for {}, ending it", domain),
            Message::SessionIdle(domain, reason) => format!("Going idle, pausing session for {} ({})", domain, reason),
            Message::SessionResumed(domain, secs) => format!("Resuming {} after {}s idle", domain, secs),

            // === ACCOUNTING MESSAGES ===
            Message::FlushSaved { domain, seconds, today } => {
                format!("Saved {}s for {}, total today: {}s", seconds, domain, today)
            }
            Message::FlushFailed(error) => format!("Failed to save session time, will retry: {}", error),
            Message::BacklogQueued(domain, seconds) => format!("Queued {}s for {} until storage recovers", seconds, domain),
            Message::BacklogDrained(count) => format!("Saved {} queued credit(s)", count),
            Message::ForceSyncFailed(error) => format!("Forced sync failed: {}", error),

            // === PROBE MESSAGES ===
            Message::ProbeTimedOut(ms) => format!("Page did not answer the activity check within {}ms", ms),
            Message::ProbeUnavailable(reason) => format!("Page activity probe unavailable: {}", reason),
            Message::ProbeResultDiscarded(ticket) => format!("Discarded stale activity probe result #{}", ticket),

            // === LIMIT MESSAGES ===
            Message::LimitAlertTitle => "TimeUP Alert".to_string(),
            Message::LimitExceeded { domain, period, spent, limit } => {
                format!("{} - {} limit exceeded!\nSpent: {} / Limit: {}", domain, period, spent, limit)
            }
            Message::NotificationFailed(error) => format!("Failed to deliver limit notification: {}", error),
            Message::LimitsUpdated(domain) => format!("Limits updated for {}", domain),

            // === MAINTENANCE MESSAGES ===
            Message::DailyRolloverDone(count) => format!("Daily rollover pruned {} old day bucket(s)", count),
            Message::WeeklyRolloverDone(count) => format!("Weekly rollover pruned {} old week bucket(s)", count),
            Message::RolloverFailed(error) => format!("Rollover failed: {}", error),

            // === SETTINGS MESSAGES ===
            Message::SettingsApplied => "Settings applied".to_string(),
            Message::SettingsRejected(error) => format!("Ignoring settings update, keeping previous values: {}", error),

            // === ENGINE / WATCHER MESSAGES ===
            Message::EngineStarted {
                idle_threshold,
                media_idle_threshold,
                poll_interval,
            } => format!(
                "Tracking engine started (idle threshold: {}s, media idle threshold: {}s, poll interval: {}ms)",
                idle_threshold, media_idle_threshold, poll_interval
            ),
            Message::EngineStopped => "Tracking engine stopped".to_string(),
            Message::EngineShuttingDown => "Tracking engine shutting down...".to_string(),
            Message::EngineUnavailable => "Tracking engine is not running".to_string(),
            Message::EngineError(error) => format!("Tracking engine error: {}", error),
            Message::EngineTaskPanicked(error) => format!("Tracking engine task panicked: {}", error),
            Message::WatcherReceivedSigterm => "Received SIGTERM, shutting down...".to_string(),
            Message::WatcherReceivedSigint => "Received SIGINT, shutting down...".to_string(),
            Message::WatcherReceivedCtrlC => "Received Ctrl+C, shutting down...".to_string(),
            Message::WatcherCtrlCListenFailed(error) => format!("Failed to listen for Ctrl+C: {}", error),
            Message::WatcherSignalHandlingNotSupported => "Signal handling is not supported on this platform".to_string(),
            Message::FailedToCreateSigtermHandler => "Failed to create SIGTERM handler".to_string(),
            Message::FailedToCreateSigintHandler => "Failed to create SIGINT handler".to_string(),

            // === BRIDGE MESSAGES ===
            Message::BridgeMalformedMessage(error) => format!("Ignoring malformed host message: {}", error),
            Message::BridgeUnknownResponse(id) => format!("Ignoring response to unknown or expired request {}", id),
            Message::BridgeInputClosed => "Host closed the bridge input".to_string(),
            Message::BridgeWriteFailed(error) => format!("Failed to write to host: {}", error),

            // === DATA MESSAGES ===
            Message::InvalidDomain(input) => format!("Invalid domain format: {}", input),
            Message::DomainRemoved(domain) => format!("Removed {} and all its data", domain),
            Message::DomainNotFound(domain) => format!("No data recorded for {}", domain),
            Message::DataReset(period) => format!("{} data reset successfully", period),
            Message::ConfirmResetAll => "This will delete ALL tracking data. Are you sure?".to_string(),
            Message::NoDomainsTracked => "No domains tracked yet".to_string(),
            Message::StatsHeader(date) => format!("Usage for {}", date),

            // === CONFIGURATION MESSAGES ===
            Message::ConfigSaved => "Configuration saved successfully".to_string(),
            Message::ConfigModuleSettings => "Tracking settings".to_string(),
            Message::ConfigMalformed(e) => format!("Config file is malformed, using defaults: {}", e),
            Message::ConfigSettingsInvalid(e) => format!("Invalid settings in config file, using defaults: {}", e),
            Message::ConfigTimingClamped => "Timing values in config file were out of range and have been clamped".to_string(),
            Message::PromptNotificationsEnabled => "Enable limit notifications?".to_string(),
            Message::PromptIdleDetectionEnabled => "Enable idle detection?".to_string(),
            Message::PromptIdleThreshold => "Idle threshold (seconds, 10-300)".to_string(),
            Message::PromptMediaIdleThreshold => "Idle threshold while media is playing (seconds)".to_string(),

            // === GENERAL MESSAGES ===
            Message::OperationCancelled => "Operation cancelled".to_string(),
        };
        write!(f, "{}", text)
    }
}
