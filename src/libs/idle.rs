//! ACTIVE/IDLE decision for the live session.
//!
//! The machine is pure: it reads the session's activity bookkeeping and one
//! [`Observation`] and returns a [`Verdict`]. It never touches counters. When
//! it decides ACTIVE → IDLE the caller flushes first and only then marks the
//! session idle.
//!
//! ## Rules while ACTIVE
//!
//! The session goes idle when any of these holds, checked in this order:
//!
//! 1. the host reports idle or locked (host state wins over page inference);
//! 2. the window is unfocused and the last known activity is older than the threshold;
//! 3. a sample arrived and the page is hidden or its activity is older than the threshold;
//! 4. no sample has arrived for the probe grace period and the last known
//!    activity is older than the threshold.
//!
//! A missing sample alone never idles the session.
//!
//! ## Rules while IDLE
//!
//! The session resumes on a fresh sample from a focused, visible page whose
//! activity is within the threshold, provided the host is not idle or locked.
//! Re-queries triggered by the host becoming active or the window regaining
//! focus always use the normal threshold. The caller checks that the session's
//! tab is still the host's active tab before asking.
//!
//! The applicable threshold is the media threshold whenever media is playing,
//! whichever rule is being checked.

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;

use crate::libs::activity::{HostState, Observation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleState {
    Active,
    Idle,
}

/// What caused an observation to be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Fixed-cadence poll.
    Poll,
    /// The host reported the user active again.
    HostActive,
    /// The browser window regained focus.
    FocusGained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleReason {
    HostIdle,
    HostLocked,
    WindowUnfocused,
    PageHidden,
    PageInactive,
    ProbeSilent,
}

impl fmt::Display for IdleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IdleReason::HostIdle => "host idle",
            IdleReason::HostLocked => "host locked",
            IdleReason::WindowUnfocused => "window unfocused",
            IdleReason::PageHidden => "page hidden",
            IdleReason::PageInactive => "no page activity",
            IdleReason::ProbeSilent => "probe silent",
        };
        write!(f, "{}", text)
    }
}

impl From<HostState> for Option<IdleReason> {
    fn from(state: HostState) -> Self {
        match state {
            HostState::Active => None,
            HostState::Idle => Some(IdleReason::HostIdle),
            HostState::Locked => Some(IdleReason::HostLocked),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Stay,
    GoIdle(IdleReason),
    Resume,
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub transition: Transition,
    /// Newer last-known activity time, when the sample moved it forward.
    pub activity: Option<DateTime<Utc>>,
    /// Media state reported by a valid sample.
    pub media_playing: Option<bool>,
    /// Whether a valid sample was part of this observation.
    pub sampled: bool,
}

impl Verdict {
    fn stay() -> Self {
        Verdict {
            transition: Transition::Stay,
            activity: None,
            media_playing: None,
            sampled: false,
        }
    }

    fn with(self, transition: Transition) -> Self {
        Verdict { transition, ..self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub idle: TimeDelta,
    pub media: TimeDelta,
    pub probe_grace: TimeDelta,
}

impl Thresholds {
    pub fn applicable(&self, media_playing: bool) -> TimeDelta {
        if media_playing {
            self.media.max(self.idle)
        } else {
            self.idle
        }
    }
}

/// Session bookkeeping the machine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityView {
    pub state: IdleState,
    pub last_activity: DateTime<Utc>,
    pub last_sample_at: DateTime<Utc>,
    pub media_playing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleMachine {
    pub thresholds: Thresholds,
    pub enabled: bool,
}

impl IdleMachine {
    pub fn new(thresholds: Thresholds, enabled: bool) -> Self {
        Self { thresholds, enabled }
    }

    pub fn evaluate(&self, view: &ActivityView, observation: &Observation, trigger: Trigger, now: DateTime<Utc>) -> Verdict {
        let mut verdict = Verdict::stay();
        if let Some(sample) = &observation.sample {
            verdict.sampled = true;
            verdict.media_playing = Some(sample.media_playing);
            // Page clocks can run ahead of ours; never accept activity from the future.
            let reported = sample.last_activity.min(now);
            if sample.is_visible && reported > view.last_activity {
                verdict.activity = Some(reported);
            }
        }

        if !self.enabled {
            return match view.state {
                IdleState::Idle => verdict.with(Transition::Resume),
                IdleState::Active => verdict,
            };
        }

        match view.state {
            IdleState::Active => self.while_active(view, observation, verdict, now),
            IdleState::Idle => self.while_idle(observation, verdict, trigger, now),
        }
    }

    /// Decision for a host state pushed by the host outside the poll cadence.
    ///
    /// Locking always idles. A pushed `idle` is ignored while media plays because
    /// the host's own detection interval is shorter than the media threshold; the
    /// next poll re-queries the host with the widened interval.
    pub fn on_host_state(&self, state: IdleState, host: HostState, media_playing: bool) -> Transition {
        if !self.enabled || state == IdleState::Idle {
            return Transition::Stay;
        }
        match host {
            HostState::Locked => Transition::GoIdle(IdleReason::HostLocked),
            HostState::Idle if !media_playing => Transition::GoIdle(IdleReason::HostIdle),
            _ => Transition::Stay,
        }
    }

    fn while_active(&self, view: &ActivityView, observation: &Observation, verdict: Verdict, now: DateTime<Utc>) -> Verdict {
        if let Some(reason) = Option::<IdleReason>::from(observation.host) {
            return verdict.with(Transition::GoIdle(reason));
        }

        let last_activity = verdict.activity.unwrap_or(view.last_activity);
        let media_playing = verdict.media_playing.unwrap_or(view.media_playing);
        let threshold = self.thresholds.applicable(media_playing);

        if !observation.window_focused {
            if now - last_activity > threshold {
                return verdict.with(Transition::GoIdle(IdleReason::WindowUnfocused));
            }
            return verdict;
        }

        match &observation.sample {
            Some(sample) if !sample.is_visible => verdict.with(Transition::GoIdle(IdleReason::PageHidden)),
            Some(sample) if now - sample.last_activity > threshold => verdict.with(Transition::GoIdle(IdleReason::PageInactive)),
            Some(_) => verdict,
            None => {
                let silent_for = now - view.last_sample_at;
                if silent_for > self.thresholds.probe_grace && now - last_activity > threshold {
                    verdict.with(Transition::GoIdle(IdleReason::ProbeSilent))
                } else {
                    verdict
                }
            }
        }
    }

    fn while_idle(&self, observation: &Observation, verdict: Verdict, trigger: Trigger, now: DateTime<Utc>) -> Verdict {
        if observation.host.is_away() || !observation.window_focused {
            return verdict;
        }
        let Some(sample) = &observation.sample else {
            return verdict;
        };
        let threshold = match trigger {
            Trigger::Poll => self.thresholds.applicable(sample.media_playing),
            Trigger::HostActive | Trigger::FocusGained => self.thresholds.idle,
        };
        if sample.is_visible && now - sample.last_activity < threshold {
            verdict.with(Transition::Resume)
        } else {
            verdict
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::activity::{ActivitySample, TabId, TabReport};

    fn machine() -> IdleMachine {
        IdleMachine::new(
            Thresholds {
                idle: TimeDelta::seconds(60),
                media: TimeDelta::seconds(1800),
                probe_grace: TimeDelta::seconds(30),
            },
            true,
        )
    }

    fn observation(sample: Option<ActivitySample>, host: HostState, focused: bool) -> Observation {
        Observation {
            tab: TabId(1),
            sample,
            host,
            active_tab: TabReport::Active(TabId(1)),
            window_focused: focused,
        }
    }

    fn view(state: IdleState, t0: DateTime<Utc>) -> ActivityView {
        ActivityView {
            state,
            last_activity: t0,
            last_sample_at: t0,
            media_playing: false,
        }
    }

    #[test]
    fn missing_sample_inside_grace_never_idles() {
        let t0 = Utc::now();
        let verdict = machine().evaluate(&view(IdleState::Active, t0), &observation(None, HostState::Active, true), Trigger::Poll, t0 + TimeDelta::seconds(59));
        assert_eq!(verdict.transition, Transition::Stay);
    }

    #[test]
    fn missing_sample_with_recent_activity_never_idles() {
        let t0 = Utc::now();
        let mut v = view(IdleState::Active, t0);
        v.last_sample_at = t0 - TimeDelta::seconds(120);
        let verdict = machine().evaluate(&v, &observation(None, HostState::Active, true), Trigger::Poll, t0 + TimeDelta::seconds(10));
        assert_eq!(verdict.transition, Transition::Stay);
    }

    #[test]
    fn silent_probe_and_stale_activity_idles() {
        let t0 = Utc::now();
        let verdict = machine().evaluate(&view(IdleState::Active, t0), &observation(None, HostState::Active, true), Trigger::Poll, t0 + TimeDelta::seconds(65));
        assert_eq!(verdict.transition, Transition::GoIdle(IdleReason::ProbeSilent));
    }

    #[test]
    fn media_widens_page_threshold() {
        let t0 = Utc::now();
        let sample = ActivitySample {
            last_activity: t0,
            is_visible: true,
            media_playing: true,
        };
        let at = t0 + TimeDelta::seconds(600);
        let verdict = machine().evaluate(&view(IdleState::Active, t0), &observation(Some(sample), HostState::Active, true), Trigger::Poll, at);
        assert_eq!(verdict.transition, Transition::Stay);
        assert_eq!(verdict.media_playing, Some(true));
    }

    #[test]
    fn host_lock_wins_over_fresh_sample() {
        let t0 = Utc::now();
        let sample = ActivitySample {
            last_activity: t0,
            is_visible: true,
            media_playing: false,
        };
        let verdict = machine().evaluate(&view(IdleState::Active, t0), &observation(Some(sample), HostState::Locked, true), Trigger::Poll, t0);
        assert_eq!(verdict.transition, Transition::GoIdle(IdleReason::HostLocked));
    }

    #[test]
    fn resume_on_host_active_uses_normal_threshold() {
        let t0 = Utc::now();
        let sample = ActivitySample {
            last_activity: t0,
            is_visible: true,
            media_playing: true,
        };
        let obs = observation(Some(sample), HostState::Active, true);
        let at = t0 + TimeDelta::seconds(120);
        let idle = view(IdleState::Idle, t0);
        assert_eq!(machine().evaluate(&idle, &obs, Trigger::HostActive, at).transition, Transition::Stay);
        assert_eq!(machine().evaluate(&idle, &obs, Trigger::Poll, at).transition, Transition::Resume);
    }

    #[test]
    fn pushed_host_idle_is_deferred_while_media_plays() {
        let m = machine();
        assert_eq!(m.on_host_state(IdleState::Active, HostState::Idle, true), Transition::Stay);
        assert_eq!(m.on_host_state(IdleState::Active, HostState::Idle, false), Transition::GoIdle(IdleReason::HostIdle));
        assert_eq!(m.on_host_state(IdleState::Active, HostState::Locked, true), Transition::GoIdle(IdleReason::HostLocked));
    }

    #[test]
    fn disabled_detection_resumes_idle_session() {
        let mut m = machine();
        m.enabled = false;
        let t0 = Utc::now();
        let verdict = m.evaluate(&view(IdleState::Idle, t0), &observation(None, HostState::Idle, false), Trigger::Poll, t0);
        assert_eq!(verdict.transition, Transition::Resume);
    }
}
