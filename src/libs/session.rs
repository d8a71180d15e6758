//! The live session and the manager that owns it.
//!
//! At most one [`Session`] exists at a time. It lives inside the
//! [`SessionManager`] as an `Option` and is never handed out mutably. Every
//! operation that ends a session settles its pending time first, so
//! replacement is always flush, clear, create.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::db::DomainStore;
use crate::libs::accumulator::Accumulator;
use crate::libs::activity::{HostState, Observation, TabId, TabReport};
use crate::libs::config::{Settings, SettingsError, SettingsUpdate, TimingConfig};
use crate::libs::domain::{local_date, DomainRecord};
use crate::libs::idle::{ActivityView, IdleMachine, IdleReason, IdleState, Transition, Trigger, Verdict};
use crate::libs::messages::Message;
use crate::libs::notifier::{LimitNotifier, Notifier};
use crate::libs::resource::{Resource, ResourceError};
use crate::libs::rollover;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub domain: String,
    pub tab: TabId,
    pub start_time: DateTime<Utc>,
    pub last_save_time: DateTime<Utc>,
    pub last_activity_time: DateTime<Utc>,
    /// When the page probe last answered.
    pub last_sample_time: DateTime<Utc>,
    pub idle: bool,
    pub idle_start_time: Option<DateTime<Utc>>,
    pub media_playing: bool,
}

impl Session {
    pub fn new(domain: String, tab: TabId, now: DateTime<Utc>) -> Self {
        Session {
            domain,
            tab,
            start_time: now,
            last_save_time: now,
            last_activity_time: now,
            last_sample_time: now,
            idle: false,
            idle_start_time: None,
            media_playing: false,
        }
    }

    /// Whole seconds not yet credited. Always zero while idle.
    pub fn pending_seconds(&self, now: DateTime<Utc>) -> u64 {
        if self.idle {
            return 0;
        }
        (now - self.last_save_time).num_seconds().max(0) as u64
    }

    pub fn state(&self) -> IdleState {
        if self.idle {
            IdleState::Idle
        } else {
            IdleState::Active
        }
    }

    fn view(&self) -> ActivityView {
        ActivityView {
            state: self.state(),
            last_activity: self.last_activity_time,
            last_sample_at: self.last_sample_time,
            media_playing: self.media_playing,
        }
    }

    fn absorb(&mut self, verdict: &Verdict, now: DateTime<Utc>) {
        if verdict.sampled {
            self.last_sample_time = now;
        }
        if let Some(activity) = verdict.activity {
            self.last_activity_time = self.last_activity_time.max(activity);
        }
        if let Some(media_playing) = verdict.media_playing {
            self.media_playing = media_playing;
        }
    }
}

/// Read-only view of the live session, as answered to `getCurrentSession`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub domain: Option<String>,
    /// Seconds since the session started.
    pub seconds: u64,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub start_time: Option<DateTime<Utc>>,
    pub is_idle: bool,
    pub media_playing: bool,
}

impl SessionSnapshot {
    pub fn empty() -> Self {
        SessionSnapshot {
            domain: None,
            seconds: 0,
            start_time: None,
            is_idle: false,
            media_playing: false,
        }
    }
}

pub struct SessionManager {
    session: Option<Session>,
    accumulator: Accumulator,
    limits: LimitNotifier,
    notifier: Arc<dyn Notifier>,
    settings: Settings,
    machine: IdleMachine,
    probe_grace: Duration,
    window_focused: bool,
}

impl SessionManager {
    pub fn new(store: Arc<dyn DomainStore>, notifier: Arc<dyn Notifier>, settings: Settings, timing: &TimingConfig) -> Self {
        let probe_grace = timing.grace();
        SessionManager {
            session: None,
            accumulator: Accumulator::new(store),
            limits: LimitNotifier::new(timing.cooldown()),
            notifier,
            settings,
            machine: IdleMachine::new(settings.thresholds(probe_grace), settings.idle_detection_enabled),
            probe_grace,
            window_focused: true,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    pub fn window_focused(&self) -> bool {
        self.window_focused
    }

    /// Records the window focus. Returns whether an idle session should be re-checked.
    pub fn set_window_focused(&mut self, focused: bool) -> bool {
        self.window_focused = focused;
        focused && self.session.as_ref().is_some_and(|s| s.idle)
    }

    /// Host inactivity interval matching the live session's threshold.
    pub fn host_idle_after(&self) -> Duration {
        let media_playing = self.session.as_ref().is_some_and(|s| s.media_playing);
        self.machine
            .thresholds
            .applicable(media_playing)
            .to_std()
            .unwrap_or(Duration::from_secs(self.settings.idle_threshold))
    }

    /// Replaces the live session with one for `url` in `tab`.
    ///
    /// The previous session is settled and cleared first. An untrackable URL
    /// leaves no session behind.
    pub async fn start_session(&mut self, tab: TabId, url: Option<&str>, now: DateTime<Utc>) -> Result<&Session, ResourceError> {
        self.end_session(now).await;

        let resource = Resource::parse(url).inspect_err(|e| {
            tracing::debug!(tab = %tab, "{}", Message::SessionRejected(e.to_string()));
        })?;

        tracing::info!(tab = %tab, "{}", Message::SessionStarted(resource.domain.clone()));
        Ok(&*self.session.insert(Session::new(resource.domain, tab, now)))
    }

    /// Settles and clears the live session, returning it.
    pub async fn end_session(&mut self, now: DateTime<Utc>) -> Option<Session> {
        let mut session = self.session.take()?;
        if let Some(record) = self.accumulator.settle(&mut session, now).await {
            self.check_limits(&session.domain, &record, now).await;
        }
        tracing::info!("{}", Message::SessionEnded(session.domain.clone()));
        Some(session)
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        match &self.session {
            Some(session) => SessionSnapshot {
                domain: Some(session.domain.clone()),
                seconds: (now - session.start_time).num_seconds().max(0) as u64,
                start_time: Some(session.start_time),
                is_idle: session.idle,
                media_playing: session.media_playing,
            },
            None => SessionSnapshot::empty(),
        }
    }

    /// Flushes the live session (and any queued credits).
    pub async fn flush(&mut self, now: DateTime<Utc>) -> anyhow::Result<()> {
        let Some(session) = self.session.as_mut() else {
            return self.accumulator.drain_backlog().await;
        };
        if let Some(record) = self.accumulator.flush(session, now).await? {
            let domain = session.domain.clone();
            self.check_limits(&domain, &record, now).await;
        }
        Ok(())
    }

    /// Ends the session when the host reports a different active tab. Returns whether it ended.
    pub async fn reconcile_active_tab(&mut self, report: TabReport, now: DateTime<Utc>) -> bool {
        let Some(session) = &self.session else {
            return false;
        };
        // Without focus the host's notion of the current window is unreliable.
        if !self.window_focused {
            return false;
        }
        let mismatch = match report {
            TabReport::Active(tab) => tab != session.tab,
            TabReport::NoneActive => true,
            TabReport::Unknown => false,
        };
        if mismatch {
            tracing::info!("{}", Message::SessionTabMismatch(session.domain.clone()));
            self.end_session(now).await;
        }
        mismatch
    }

    /// Applies one observation of the live session's signals.
    ///
    /// Observations for any tab other than the live session's are ignored. A
    /// session whose tab is no longer the host's active tab ends instead of
    /// being evaluated, so it can never resume in the background.
    pub async fn apply_observation(&mut self, observation: &Observation, trigger: Trigger, now: DateTime<Utc>) {
        if self.session.as_ref().map(|s| s.tab) != Some(observation.tab) {
            return;
        }
        if self.reconcile_active_tab(observation.active_tab, now).await {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let verdict = self.machine.evaluate(&session.view(), observation, trigger, now);
        session.absorb(&verdict, now);
        tracing::debug!(
            domain = %session.domain,
            host = %observation.host,
            focused = observation.window_focused,
            sampled = verdict.sampled,
            "{:?}",
            verdict.transition
        );

        match verdict.transition {
            Transition::Stay => {}
            Transition::GoIdle(reason) => self.go_idle(reason, now).await,
            Transition::Resume => self.resume(now),
        }
    }

    /// Reacts to a host-pushed idle state. Returns whether an idle session should be re-checked.
    pub async fn host_state_changed(&mut self, state: HostState, now: DateTime<Utc>) -> bool {
        let Some(session) = &self.session else {
            return false;
        };
        let idle = session.idle;
        match self.machine.on_host_state(session.state(), state, session.media_playing) {
            Transition::GoIdle(reason) => {
                self.go_idle(reason, now).await;
                false
            }
            _ => state == HostState::Active && idle,
        }
    }

    /// Ends the session when its tab closed.
    pub async fn tab_removed(&mut self, tab: TabId, now: DateTime<Utc>) -> bool {
        if self.session.as_ref().map(|s| s.tab) != Some(tab) {
            return false;
        }
        self.end_session(now).await;
        true
    }

    /// Merges a raw settings update. On error the current settings stay in effect.
    pub fn apply_settings(&mut self, value: serde_json::Value, now: DateTime<Utc>) -> Result<Settings, SettingsError> {
        let update = SettingsUpdate::from_value(value)?;
        let merged = self.settings.merge(&update)?;

        self.settings = merged;
        self.machine = IdleMachine::new(merged.thresholds(self.probe_grace), merged.idle_detection_enabled);
        if !merged.idle_detection_enabled && self.session.as_ref().is_some_and(|s| s.idle) {
            self.resume(now);
        }
        tracing::info!(
            idle_threshold = merged.idle_threshold,
            media_idle_threshold = merged.media_idle_threshold,
            "{}",
            Message::SettingsApplied
        );
        Ok(merged)
    }

    /// Prunes old day buckets and clears the alert throttle. Returns the number of buckets pruned.
    pub async fn daily_rollover(&mut self, now: DateTime<Utc>) -> anyhow::Result<usize> {
        self.limits.reset();
        let pruned = rollover::prune_days(self.accumulator.store().as_ref(), local_date(now)).await?;
        tracing::info!("{}", Message::DailyRolloverDone(pruned));
        Ok(pruned)
    }

    /// Prunes old week buckets. Returns the number of buckets pruned.
    pub async fn weekly_rollover(&mut self, now: DateTime<Utc>) -> anyhow::Result<usize> {
        let pruned = rollover::prune_weeks(self.accumulator.store().as_ref(), local_date(now)).await?;
        tracing::info!("{}", Message::WeeklyRolloverDone(pruned));
        Ok(pruned)
    }

    async fn go_idle(&mut self, reason: IdleReason, now: DateTime<Utc>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.idle {
            return;
        }
        let record = self.accumulator.settle(session, now).await;
        session.idle = true;
        session.idle_start_time = Some(now);
        let domain = session.domain.clone();
        tracing::info!("{}", Message::SessionIdle(domain.clone(), reason.to_string()));

        if let Some(record) = record {
            self.check_limits(&domain, &record, now).await;
        }
    }

    fn resume(&mut self, now: DateTime<Utc>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.idle {
            return;
        }
        let idle_for = session.idle_start_time.map_or(TimeDelta::zero(), |start| now - start);
        session.idle = false;
        session.idle_start_time = None;
        session.last_save_time = now;
        session.last_activity_time = now;
        session.last_sample_time = now;
        tracing::info!("{}", Message::SessionResumed(session.domain.clone(), idle_for.num_seconds()));
    }

    async fn check_limits(&mut self, domain: &str, record: &DomainRecord, now: DateTime<Utc>) {
        if !self.settings.notifications_enabled {
            return;
        }
        for alert in self.limits.evaluate(domain, record, now) {
            if let Err(e) = self.notifier.notify(&alert).await {
                tracing::warn!(domain = %domain, "{}", Message::NotificationFailed(e.to_string()));
                continue;
            }
            self.limits.mark_sent(&alert);
            let period = alert.period;
            let stamped = self
                .accumulator
                .store()
                .update(domain, Box::new(move |record| record.stamp_notification(period, now)))
                .await;
            if let Err(e) = stamped {
                tracing::warn!(domain = %domain, "{}", Message::FlushFailed(e.to_string()));
            }
        }
    }
}
