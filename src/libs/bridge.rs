//! Newline-delimited JSON bridge between the engine and a browser host.
//!
//! The host writes one JSON object per line to our stdin and reads one per
//! line from our stdout. Every message carries a `type` tag.
//!
//! ## Host → engine
//!
//! | `type`               | fields                                        |
//! |----------------------|-----------------------------------------------|
//! | `tabActivated`       | `tabId`, `url`                                |
//! | `tabUpdated`         | `tabId`, `url`, `status`, `active`            |
//! | `tabRemoved`         | `tabId`                                       |
//! | `windowFocusChanged` | `focused`                                     |
//! | `idleStateChanged`   | `state` (`active`, `idle`, `locked`)          |
//! | `response`           | `requestId`, `payload`                        |
//! | `request`            | `requestId`, `action`, optional `settings`    |
//!
//! Requests use the actions `getCurrentSession`, `forceSync` and `updateSettings`.
//!
//! ## Engine → host
//!
//! | `type`          | fields                                   |
//! |-----------------|------------------------------------------|
//! | `probe`         | `requestId`, `tabId`, `message`          |
//! | `queryState`    | `requestId`, `idleAfter` (seconds)       |
//! | `queryActiveTab`| `requestId`                              |
//! | `notify`        | `id`, `title`, `message`                 |
//! | `response`      | `requestId`, `payload`                   |
//!
//! Engine queries are correlated by `requestId`. The engine never waits for an
//! answer longer than its probe deadline; late answers are dropped.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};

use crate::libs::activity::{ActivityProbe, ActivitySample, HostSignals, HostState, ProbeError, ProbeRequest, TabId};
use crate::libs::engine::{EngineHandle, HostEvent};
use crate::libs::messages::Message;
use crate::libs::notifier::{LimitAlert, Notifier};

pub const GET_CURRENT_SESSION: &str = "getCurrentSession";
pub const FORCE_SYNC: &str = "forceSync";
pub const UPDATE_SETTINGS: &str = "updateSettings";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Inbound {
    TabActivated {
        tab_id: TabId,
        #[serde(default)]
        url: Option<String>,
    },
    TabUpdated {
        tab_id: TabId,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        active: bool,
    },
    TabRemoved {
        tab_id: TabId,
    },
    WindowFocusChanged {
        focused: bool,
    },
    IdleStateChanged {
        state: HostState,
    },
    Response {
        request_id: u64,
        #[serde(default)]
        payload: Value,
    },
    Request {
        request_id: u64,
        action: String,
        #[serde(default)]
        settings: Value,
    },
}

impl Inbound {
    /// The engine event this message carries, if it is one.
    pub fn into_event(self) -> Option<HostEvent> {
        match self {
            Inbound::TabActivated { tab_id, url } => Some(HostEvent::TabActivated { tab: tab_id, url }),
            Inbound::TabUpdated {
                tab_id,
                url,
                status,
                active,
            } => Some(HostEvent::TabUpdated {
                tab: tab_id,
                url,
                complete: status.as_deref() == Some("complete"),
                active,
            }),
            Inbound::TabRemoved { tab_id } => Some(HostEvent::TabRemoved { tab: tab_id }),
            Inbound::WindowFocusChanged { focused } => Some(HostEvent::WindowFocusChanged { focused }),
            Inbound::IdleStateChanged { state } => Some(HostEvent::IdleStateChanged { state }),
            Inbound::Response { .. } | Inbound::Request { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Outbound {
    Probe {
        request_id: u64,
        tab_id: TabId,
        message: ProbeRequest,
    },
    QueryState {
        request_id: u64,
        idle_after: u64,
    },
    QueryActiveTab {
        request_id: u64,
    },
    Notify {
        id: String,
        title: String,
        message: String,
    },
    Response {
        request_id: u64,
        payload: Value,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveTab {
    tab_id: TabId,
}

type Pending = Mutex<HashMap<u64, oneshot::Sender<Value>>>;

/// Host-facing side of the engine: probe, host signals and notifier in one.
pub struct Bridge {
    outbound: mpsc::UnboundedSender<Outbound>,
    pending: Pending,
    next_id: AtomicU64,
}

/// Removes a pending request when its waiter goes away, answered or not.
struct PendingGuard<'a> {
    pending: &'a Pending,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

impl Bridge {
    /// Creates the bridge and the receiver of everything it wants to send.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Outbound>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let bridge = Bridge {
            outbound,
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        };
        (Arc::new(bridge), rx)
    }

    fn send(&self, message: Outbound) -> Result<(), ProbeError> {
        self.outbound.send(message).map_err(|_| ProbeError::Closed)
    }

    /// Sends a query and waits for the matching response payload.
    async fn request(&self, build: impl FnOnce(u64) -> Outbound) -> Result<Value, ProbeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        let _guard = PendingGuard { pending: &self.pending, id };

        self.send(build(id))?;
        rx.await.map_err(|_| ProbeError::Closed)
    }

    /// Routes a response to its waiter.
    pub fn resolve(&self, request_id: u64, payload: Value) {
        let waiter = self.pending.lock().remove(&request_id);
        match waiter {
            Some(tx) => {
                let _ = tx.send(payload);
            }
            None => tracing::debug!("{}", Message::BridgeUnknownResponse(request_id)),
        }
    }

    /// Reads host messages until the input closes.
    pub async fn run_reader<R>(self: Arc<Self>, reader: R, engine: EngineHandle) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let message: Inbound = match serde_json::from_str(line) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!("{}", Message::BridgeMalformedMessage(e.to_string()));
                    continue;
                }
            };
            match message {
                Inbound::Response { request_id, payload } => self.resolve(request_id, payload),
                Inbound::Request {
                    request_id,
                    action,
                    settings,
                } => {
                    let bridge = Arc::clone(&self);
                    let engine = engine.clone();
                    tokio::spawn(async move {
                        let payload = answer(&engine, &action, settings).await;
                        if bridge.send(Outbound::Response { request_id, payload }).is_err() {
                            tracing::warn!("{}", Message::BridgeWriteFailed(ProbeError::Closed.to_string()));
                        }
                    });
                }
                event => {
                    if let Some(event) = event.into_event() {
                        engine.send(event).await?;
                    }
                }
            }
        }
        tracing::info!("{}", Message::BridgeInputClosed);
        Ok(())
    }

    /// Writes outbound messages, one JSON object per line, until every sender is gone.
    pub async fn run_writer<W>(mut outbound: mpsc::UnboundedReceiver<Outbound>, mut writer: W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while let Some(message) = outbound.recv().await {
            let mut line = serde_json::to_vec(&message)?;
            line.push(b'\n');
            writer.write_all(&line).await?;
            writer.flush().await?;
        }
        Ok(())
    }
}

async fn answer(engine: &EngineHandle, action: &str, settings: Value) -> Value {
    let result = match action {
        GET_CURRENT_SESSION => engine.current_session().await.and_then(|snapshot| Ok(serde_json::to_value(snapshot)?)),
        FORCE_SYNC => engine.force_sync().await.map(|success| json!({ "success": success })),
        UPDATE_SETTINGS => engine.update_settings(settings).await.map(|success| json!({ "success": success })),
        other => Ok(json!({ "error": format!("unknown action: {}", other) })),
    };
    result.unwrap_or_else(|e| json!({ "error": e.to_string() }))
}

#[async_trait]
impl ActivityProbe for Bridge {
    async fn check_activity(&self, tab: TabId) -> Result<ActivitySample, ProbeError> {
        let payload = self
            .request(|request_id| Outbound::Probe {
                request_id,
                tab_id: tab,
                message: ProbeRequest::check_activity(),
            })
            .await?;
        if payload.is_null() {
            return Err(ProbeError::Unavailable);
        }
        if let Some(error) = payload.get("error") {
            return Err(ProbeError::Rejected(error.to_string()));
        }
        serde_json::from_value(payload).map_err(|e| ProbeError::Rejected(e.to_string()))
    }
}

#[async_trait]
impl HostSignals for Bridge {
    async fn query_state(&self, idle_after: Duration) -> HostState {
        let payload = self
            .request(|request_id| Outbound::QueryState {
                request_id,
                idle_after: idle_after.as_secs(),
            })
            .await;
        payload.ok().and_then(|value| serde_json::from_value(value).ok()).unwrap_or_default()
    }

    async fn active_tab(&self) -> Option<TabId> {
        let payload = self.request(|request_id| Outbound::QueryActiveTab { request_id }).await.ok()?;
        serde_json::from_value::<ActiveTab>(payload).ok().map(|active| active.tab_id)
    }
}

#[async_trait]
impl Notifier for Bridge {
    async fn notify(&self, alert: &LimitAlert) -> Result<()> {
        self.send(Outbound::Notify {
            id: alert.id(),
            title: alert.title(),
            message: alert.body(),
        })?;
        Ok(())
    }
}
