//! Converts elapsed active time into persisted counters.
//!
//! A flush credits the whole seconds elapsed since the session's last save to
//! the domain's day, week and total counters through one atomic
//! [`DomainStore::update`], so the record is always re-read right before it is
//! written. `last_save_time` only moves after the write succeeded and only by
//! the seconds actually credited; the sub-second remainder carries into the
//! next flush.
//!
//! A terminal flush (session end, going idle) that fails cannot be retried
//! from the session, so its credit is queued. Queued credits are written
//! before anything else on every later flush, which keeps one session's time
//! ahead of the next session's in the store.

use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::db::DomainStore;
use crate::libs::domain::{DomainRecord, Period};
use crate::libs::messages::Message;
use crate::libs::session::Session;

/// Time owed to a domain that could not be written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credit {
    pub domain: String,
    pub seconds: u64,
    pub at: DateTime<Utc>,
}

pub struct Accumulator {
    store: Arc<dyn DomainStore>,
    backlog: VecDeque<Credit>,
}

impl Accumulator {
    pub fn new(store: Arc<dyn DomainStore>) -> Self {
        Self {
            store,
            backlog: VecDeque::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn DomainStore> {
        &self.store
    }

    pub fn backlog(&self) -> &VecDeque<Credit> {
        &self.backlog
    }

    /// Writes queued credits in order, stopping at the first failure.
    pub async fn drain_backlog(&mut self) -> Result<()> {
        let mut drained = 0;
        while let Some(credit) = self.backlog.front().cloned() {
            let Credit { domain, seconds, at } = credit;
            self.store.update(&domain, Box::new(move |record| record.credit(seconds, at))).await?;
            self.backlog.pop_front();
            drained += 1;
        }
        if drained > 0 {
            tracing::info!("{}", Message::BacklogDrained(drained));
        }
        Ok(())
    }

    /// Credits the session's pending time. Returns the stored record when anything was written.
    pub async fn flush(&mut self, session: &mut Session, now: DateTime<Utc>) -> Result<Option<DomainRecord>> {
        self.drain_backlog().await?;

        let seconds = session.pending_seconds(now);
        if seconds == 0 {
            return Ok(None);
        }

        let record = self
            .store
            .update(&session.domain, Box::new(move |record| record.credit(seconds, now)))
            .await?;
        session.last_save_time += TimeDelta::seconds(seconds as i64);

        tracing::debug!(
            "{}",
            Message::FlushSaved {
                domain: session.domain.clone(),
                seconds,
                today: record.spent(Period::Daily, now),
            }
        );
        Ok(Some(record))
    }

    /// Final flush for a session about to end or pause. Never fails: time that
    /// cannot be written now is queued.
    pub async fn settle(&mut self, session: &mut Session, now: DateTime<Utc>) -> Option<DomainRecord> {
        match self.flush(session, now).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("{}", Message::FlushFailed(e.to_string()));
                let seconds = session.pending_seconds(now);
                if seconds > 0 {
                    tracing::warn!("{}", Message::BacklogQueued(session.domain.clone(), seconds));
                    self.backlog.push_back(Credit {
                        domain: session.domain.clone(),
                        seconds,
                        at: now,
                    });
                    session.last_save_time += TimeDelta::seconds(seconds as i64);
                }
                None
            }
        }
    }
}
