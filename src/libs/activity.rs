//! Signal sources for the activity engine.
//!
//! Three independent signals feed the idle decision:
//!
//! - **Page probe**: a bounded request/response exchange with the page in the
//!   session's tab (`{"action": "checkActivity"}`), answered with the last
//!   interaction time, visibility and media playback state.
//! - **Host idle/lock state**: coarse, page-independent, reported by the host.
//! - **Window focus**: pushed by the host as events and cached by the engine.
//!
//! [`SignalSource`] samples the first two (plus the host's active tab) under
//! an explicit deadline and folds them into one [`Observation`]. A probe that
//! fails or times out yields `None`: missing information, never proof of
//! idleness on its own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

use crate::libs::messages::Message;

/// Opaque identifier of a browsing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Page-level activity as reported by the probe. Timestamps travel as epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySample {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_activity: DateTime<Utc>,
    pub is_visible: bool,
    #[serde(default)]
    pub media_playing: bool,
}

/// Request sent to the page probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeRequest {
    pub action: String,
}

impl ProbeRequest {
    pub const CHECK_ACTIVITY: &'static str = "checkActivity";

    pub fn check_activity() -> Self {
        ProbeRequest {
            action: Self::CHECK_ACTIVITY.to_string(),
        }
    }
}

/// Host-level idle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostState {
    #[default]
    Active,
    Idle,
    Locked,
}

impl HostState {
    /// Idle or locked.
    pub fn is_away(&self) -> bool {
        matches!(self, HostState::Idle | HostState::Locked)
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostState::Active => write!(f, "active"),
            HostState::Idle => write!(f, "idle"),
            HostState::Locked => write!(f, "locked"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("page hosts no activity probe")]
    Unavailable,
    #[error("probe rejected: {0}")]
    Rejected(String),
    #[error("probe channel closed")]
    Closed,
}

/// Page-level activity probe bound to a tab.
#[async_trait]
pub trait ActivityProbe: Send + Sync {
    async fn check_activity(&self, tab: TabId) -> Result<ActivitySample, ProbeError>;
}

/// Host-level signals that do not depend on the page.
#[async_trait]
pub trait HostSignals: Send + Sync {
    /// Host idle/lock state, using `idle_after` as the host's inactivity interval.
    async fn query_state(&self, idle_after: Duration) -> HostState;

    /// Tab the host currently reports as active, if any.
    async fn active_tab(&self) -> Option<TabId>;
}

/// What the host said about its active tab during an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabReport {
    Active(TabId),
    NoneActive,
    /// The host did not answer in time.
    Unknown,
}

/// One normalized sample of every signal for the session's tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub tab: TabId,
    pub sample: Option<ActivitySample>,
    pub host: HostState,
    pub active_tab: TabReport,
    pub window_focused: bool,
}

/// Samples page and host signals under explicit deadlines.
#[derive(Clone)]
pub struct SignalSource {
    probe: Arc<dyn ActivityProbe>,
    host: Arc<dyn HostSignals>,
    probe_timeout: Duration,
}

impl SignalSource {
    pub fn new(probe: Arc<dyn ActivityProbe>, host: Arc<dyn HostSignals>, probe_timeout: Duration) -> Self {
        Self { probe, host, probe_timeout }
    }

    /// Asks the page in `tab` for its activity, giving up after the probe timeout.
    pub async fn sample(&self, tab: TabId) -> Option<ActivitySample> {
        match timeout(self.probe_timeout, self.probe.check_activity(tab)).await {
            Ok(Ok(sample)) => Some(sample),
            Ok(Err(e)) => {
                tracing::debug!(tab = %tab, "{}", Message::ProbeUnavailable(e.to_string()));
                None
            }
            Err(_) => {
                tracing::debug!(tab = %tab, "{}", Message::ProbeTimedOut(self.probe_timeout.as_millis() as u64));
                None
            }
        }
    }

    /// Host idle/lock state over `idle_after` of inactivity; an unanswered query counts as active.
    pub async fn host_state(&self, idle_after: Duration) -> HostState {
        timeout(self.probe_timeout, self.host.query_state(idle_after))
            .await
            .unwrap_or_default()
    }

    pub async fn active_tab(&self) -> TabReport {
        match timeout(self.probe_timeout, self.host.active_tab()).await {
            Ok(Some(tab)) => TabReport::Active(tab),
            Ok(None) => TabReport::NoneActive,
            Err(_) => TabReport::Unknown,
        }
    }

    /// Samples all signals concurrently. The page is only probed while the window has focus.
    pub async fn observe(&self, tab: TabId, window_focused: bool, idle_after: Duration) -> Observation {
        let page = async {
            if window_focused {
                self.sample(tab).await
            } else {
                None
            }
        };
        let (sample, host, active_tab) = tokio::join!(page, self.host_state(idle_after), self.active_tab());

        Observation {
            tab,
            sample,
            host,
            active_tab,
            window_focused,
        }
    }
}
