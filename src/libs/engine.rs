//! Serialized event loop driving the session manager.
//!
//! Everything that can change the session arrives as a message on one
//! channel and is handled by a single consumer: host events, requests from
//! the host, the poll and save timers, the rollover timers, and the results
//! of signal observations. No two flushes or transitions ever interleave.
//!
//! Signal observations run as separate tasks so a slow page never stalls the
//! loop. Each one carries a ticket; starting or ending a session aborts the
//! task in flight and invalidates its ticket, so a late result for the old
//! tab is dropped instead of merged.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use timeup::db::memory::MemoryDomains;
//! use timeup::libs::activity::{SignalSource, TabId};
//! use timeup::libs::clock::SystemClock;
//! use timeup::libs::config::Config;
//! use timeup::libs::engine::{Engine, HostEvent};
//! use timeup::libs::notifier::LogNotifier;
//! use timeup::libs::session::SessionManager;
//! # use timeup::libs::activity::{ActivityProbe, HostSignals};
//! # async fn run(probe: Arc<dyn ActivityProbe>, host: Arc<dyn HostSignals>) -> anyhow::Result<()> {
//! let config = Config::default();
//! let manager = SessionManager::new(Arc::new(MemoryDomains::new()), Arc::new(LogNotifier), config.settings, &config.timing);
//! let signals = SignalSource::new(probe, host, config.timing.probe_deadline());
//! let (engine, handle) = Engine::new(manager, signals, Arc::new(SystemClock), config.timing);
//! let task = tokio::spawn(engine.run());
//!
//! handle.send(HostEvent::TabActivated { tab: TabId(7), url: Some("https://example.com".into()) }).await?;
//! println!("{:?}", handle.current_session().await?);
//! handle.shutdown().await?;
//! task.await??;
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};

use crate::libs::activity::{HostState, Observation, SignalSource, TabId};
use crate::libs::clock::Clock;
use crate::libs::config::TimingConfig;
use crate::libs::idle::Trigger;
use crate::libs::messages::Message;
use crate::libs::rollover::{next_midnight, next_monday};
use crate::libs::session::{SessionManager, SessionSnapshot};
use crate::msg_error_anyhow;

const INPUT_CAPACITY: usize = 256;

/// Something the host observed and pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    TabActivated {
        tab: TabId,
        url: Option<String>,
    },
    TabUpdated {
        tab: TabId,
        url: Option<String>,
        complete: bool,
        active: bool,
    },
    TabRemoved {
        tab: TabId,
    },
    WindowFocusChanged {
        focused: bool,
    },
    IdleStateChanged {
        state: HostState,
    },
}

/// Requests answered by the engine.
#[derive(Debug)]
pub enum Command {
    GetCurrentSession(oneshot::Sender<SessionSnapshot>),
    ForceSync(oneshot::Sender<bool>),
    UpdateSettings(serde_json::Value, oneshot::Sender<bool>),
    DailyRollover,
    WeeklyRollover,
    Shutdown,
}

#[derive(Debug)]
enum Input {
    Event(HostEvent),
    Command(Command),
}

struct Observed {
    ticket: u64,
    trigger: Trigger,
    observation: Observation,
}

struct InFlight {
    ticket: u64,
    task: AbortHandle,
}

/// Cloneable sender side of the engine.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Input>,
}

impl EngineHandle {
    pub async fn send(&self, event: HostEvent) -> Result<()> {
        self.submit(Input::Event(event)).await
    }

    pub async fn current_session(&self) -> Result<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.submit(Input::Command(Command::GetCurrentSession(reply))).await?;
        rx.await.map_err(|_| msg_error_anyhow!(Message::EngineUnavailable))
    }

    /// Flushes immediately. Resolves to whether the write succeeded.
    pub async fn force_sync(&self) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.submit(Input::Command(Command::ForceSync(reply))).await?;
        rx.await.map_err(|_| msg_error_anyhow!(Message::EngineUnavailable))
    }

    /// Applies a partial settings update. Resolves to whether it was accepted.
    pub async fn update_settings(&self, settings: serde_json::Value) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.submit(Input::Command(Command::UpdateSettings(settings, reply))).await?;
        rx.await.map_err(|_| msg_error_anyhow!(Message::EngineUnavailable))
    }

    pub async fn daily_rollover(&self) -> Result<()> {
        self.submit(Input::Command(Command::DailyRollover)).await
    }

    pub async fn weekly_rollover(&self) -> Result<()> {
        self.submit(Input::Command(Command::WeeklyRollover)).await
    }

    /// Asks the engine to settle the live session and stop.
    pub async fn shutdown(&self) -> Result<()> {
        self.submit(Input::Command(Command::Shutdown)).await
    }

    async fn submit(&self, input: Input) -> Result<()> {
        self.tx.send(input).await.map_err(|_| msg_error_anyhow!(Message::EngineUnavailable))
    }
}

pub struct Engine {
    manager: SessionManager,
    signals: SignalSource,
    clock: Arc<dyn Clock>,
    timing: TimingConfig,
    inputs: mpsc::Receiver<Input>,
    observed_tx: mpsc::UnboundedSender<Observed>,
    observed_rx: mpsc::UnboundedReceiver<Observed>,
    next_ticket: u64,
    in_flight: Option<InFlight>,
}

impl Engine {
    pub fn new(manager: SessionManager, signals: SignalSource, clock: Arc<dyn Clock>, timing: TimingConfig) -> (Self, EngineHandle) {
        let (tx, inputs) = mpsc::channel(INPUT_CAPACITY);
        let (observed_tx, observed_rx) = mpsc::unbounded_channel();
        let engine = Engine {
            manager,
            signals,
            clock,
            timing,
            inputs,
            observed_tx,
            observed_rx,
            next_ticket: 0,
            in_flight: None,
        };
        (engine, EngineHandle { tx })
    }

    /// Runs until shutdown is requested or every handle is dropped, then settles the live session.
    pub async fn run(mut self) -> Result<()> {
        let settings = self.manager.settings();
        tracing::info!(
            "{}",
            Message::EngineStarted {
                idle_threshold: settings.idle_threshold,
                media_idle_threshold: settings.media_idle_threshold,
                poll_interval: self.timing.poll_interval,
            }
        );

        let mut poll = interval(self.timing.poll_every());
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut save = interval(self.timing.save_every());
        save.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let daily = sleep(self.until(next_midnight(self.clock.now())));
        let weekly = sleep(self.until(next_monday(self.clock.now())));
        tokio::pin!(daily, weekly);

        loop {
            tokio::select! {
                input = self.inputs.recv() => match input {
                    Some(Input::Command(Command::Shutdown)) | None => break,
                    Some(Input::Event(event)) => self.on_event(event).await,
                    Some(Input::Command(command)) => self.on_command(command).await,
                },
                Some(observed) = self.observed_rx.recv() => self.on_observed(observed).await,
                _ = poll.tick() => self.on_poll(),
                _ = save.tick() => self.on_save().await,
                _ = &mut daily => {
                    self.rollover_daily().await;
                    daily.as_mut().reset(Instant::now() + self.until(next_midnight(self.clock.now())));
                }
                _ = &mut weekly => {
                    self.rollover_weekly().await;
                    weekly.as_mut().reset(Instant::now() + self.until(next_monday(self.clock.now())));
                }
            }
        }

        tracing::info!("{}", Message::EngineShuttingDown);
        self.cancel_observation();
        let now = self.clock.now();
        self.manager.end_session(now).await;
        if let Err(e) = self.manager.flush(now).await {
            tracing::warn!("{}", Message::FlushFailed(e.to_string()));
        }
        tracing::info!("{}", Message::EngineStopped);
        Ok(())
    }

    fn until(&self, at: DateTime<Utc>) -> Duration {
        (at - self.clock.now()).to_std().unwrap_or(Duration::ZERO)
    }

    async fn on_event(&mut self, event: HostEvent) {
        let now = self.clock.now();
        match event {
            HostEvent::TabActivated { tab, url } => self.switch_to(tab, url, now).await,
            HostEvent::TabUpdated { tab, url, complete, active } => {
                if active && complete {
                    self.switch_to(tab, url, now).await;
                }
            }
            HostEvent::TabRemoved { tab } => {
                if self.manager.session().is_some_and(|s| s.tab == tab) {
                    self.cancel_observation();
                    self.manager.tab_removed(tab, now).await;
                }
            }
            HostEvent::WindowFocusChanged { focused } => {
                if self.manager.set_window_focused(focused) {
                    self.observe(Trigger::FocusGained);
                }
            }
            HostEvent::IdleStateChanged { state } => {
                // A sample taken before the host went away must not resume the session.
                if state.is_away() {
                    self.cancel_observation();
                }
                if self.manager.host_state_changed(state, now).await {
                    self.observe(Trigger::HostActive);
                }
            }
        }
    }

    async fn switch_to(&mut self, tab: TabId, url: Option<String>, now: DateTime<Utc>) {
        self.cancel_observation();
        // A rejected resource is not an error; the session is simply gone.
        let _ = self.manager.start_session(tab, url.as_deref(), now).await;
    }

    async fn on_command(&mut self, command: Command) {
        let now = self.clock.now();
        match command {
            Command::GetCurrentSession(reply) => {
                let _ = reply.send(self.manager.snapshot(now));
            }
            Command::ForceSync(reply) => {
                let synced = match self.manager.flush(now).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!("{}", Message::ForceSyncFailed(e.to_string()));
                        false
                    }
                };
                let _ = reply.send(synced);
            }
            Command::UpdateSettings(value, reply) => {
                let applied = match self.manager.apply_settings(value, now) {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::warn!("{}", Message::SettingsRejected(e.to_string()));
                        false
                    }
                };
                let _ = reply.send(applied);
            }
            Command::DailyRollover => self.rollover_daily().await,
            Command::WeeklyRollover => self.rollover_weekly().await,
            Command::Shutdown => {}
        }
    }

    fn on_poll(&mut self) {
        // A finished task that never reported back panicked; replace it.
        if self.in_flight.as_ref().is_some_and(|f| !f.task.is_finished()) {
            return;
        }
        self.observe(Trigger::Poll);
    }

    async fn on_save(&mut self) {
        if let Err(e) = self.manager.flush(self.clock.now()).await {
            tracing::warn!("{}", Message::FlushFailed(e.to_string()));
        }
    }

    async fn on_observed(&mut self, observed: Observed) {
        if self.in_flight.as_ref().map(|f| f.ticket) != Some(observed.ticket) {
            tracing::debug!("{}", Message::ProbeResultDiscarded(observed.ticket));
            return;
        }
        self.in_flight = None;
        let now = self.clock.now();
        self.manager.apply_observation(&observed.observation, observed.trigger, now).await;
    }

    /// Starts an observation of the live session's tab, replacing any in flight.
    fn observe(&mut self, trigger: Trigger) {
        let Some(session) = self.manager.session() else {
            return;
        };
        let tab = session.tab;
        let focused = self.manager.window_focused();
        let idle_after = self.manager.host_idle_after();
        self.cancel_observation();

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let signals = self.signals.clone();
        let observed_tx = self.observed_tx.clone();
        let task = tokio::spawn(async move {
            let observation = signals.observe(tab, focused, idle_after).await;
            let _ = observed_tx.send(Observed {
                ticket,
                trigger,
                observation,
            });
        });
        self.in_flight = Some(InFlight {
            ticket,
            task: task.abort_handle(),
        });
    }

    fn cancel_observation(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.task.abort();
        }
    }

    async fn rollover_daily(&mut self) {
        if let Err(e) = self.manager.daily_rollover(self.clock.now()).await {
            tracing::warn!("{}", Message::RolloverFailed(e.to_string()));
        }
    }

    async fn rollover_weekly(&mut self) {
        if let Err(e) = self.manager.weekly_rollover(self.clock.now()).await {
            tracing::warn!("{}", Message::RolloverFailed(e.to_string()));
        }
    }
}
