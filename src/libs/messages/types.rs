#[derive(Debug, Clone)]
pub enum Message {
    // === SESSION MESSAGES ===
    SessionStarted(String),         // domain
    SessionEnded(String),           // domain
    SessionRejected(String),        // reason
    SessionTabMismatch(String),     // domain
    SessionIdle(String, String),    // domain, reason
    SessionResumed(String, i64),    // domain, idle seconds

    // === ACCOUNTING MESSAGES ===
    FlushSaved {
        domain: String,
        seconds: u64,
        today: u64,
    },
    FlushFailed(String),            // error
    BacklogQueued(String, u64),     // domain, seconds
    BacklogDrained(usize),          // credits
    ForceSyncFailed(String),        // error

    // === PROBE MESSAGES ===
    ProbeTimedOut(u64),             // timeout ms
    ProbeUnavailable(String),       // reason
    ProbeResultDiscarded(u64),      // ticket

    // === LIMIT MESSAGES ===
    LimitAlertTitle,
    LimitExceeded {
        domain: String,
        period: String,
        spent: String,
        limit: String,
    },
    NotificationFailed(String),     // error
    LimitsUpdated(String),          // domain

    // === MAINTENANCE MESSAGES ===
    DailyRolloverDone(usize),       // pruned entries
    WeeklyRolloverDone(usize),      // pruned entries
    RolloverFailed(String),         // error

    // === SETTINGS MESSAGES ===
    SettingsApplied,
    SettingsRejected(String),       // error

    // === ENGINE / WATCHER MESSAGES ===
    EngineStarted {
        idle_threshold: u64,
        media_idle_threshold: u64,
        poll_interval: u64,
    },
    EngineStopped,
    EngineShuttingDown,
    EngineUnavailable,
    EngineError(String),            // error
    EngineTaskPanicked(String),     // error
    WatcherReceivedSigterm,
    WatcherReceivedSigint,
    WatcherReceivedCtrlC,
    WatcherCtrlCListenFailed(String), // error
    WatcherSignalHandlingNotSupported,
    FailedToCreateSigtermHandler,
    FailedToCreateSigintHandler,

    // === BRIDGE MESSAGES ===
    BridgeMalformedMessage(String), // error
    BridgeUnknownResponse(u64),     // request id
    BridgeInputClosed,
    BridgeWriteFailed(String),      // error

    // === DATA MESSAGES ===
    InvalidDomain(String),          // input
    DomainRemoved(String),          // domain
    DomainNotFound(String),         // domain
    DataReset(String),              // period
    ConfirmResetAll,
    NoDomainsTracked,
    StatsHeader(String),            // date

    // === CONFIGURATION MESSAGES ===
    ConfigSaved,
    ConfigModuleSettings,
    ConfigMalformed(String),        // error
    ConfigSettingsInvalid(String),  // error
    ConfigTimingClamped,
    PromptNotificationsEnabled,
    PromptIdleDetectionEnabled,
    PromptIdleThreshold,
    PromptMediaIdleThreshold,

    // === GENERAL MESSAGES ===
    OperationCancelled,
}
