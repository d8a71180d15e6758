//! Explicit user resets of recorded time.
//!
//! `daily` and `weekly` zero the current bucket of every domain and keep
//! history, totals and limits. `all` deletes every record after confirmation.
//! A running watcher tolerates these edits: it re-reads each record right
//! before its next flush.

use crate::db::{domains::Domains, DomainStore};
use crate::libs::domain::Period;
use crate::libs::messages::Message;
use crate::{msg_info, msg_success};
use anyhow::Result;
use chrono::Utc;
use clap::{Args, ValueEnum};
use dialoguer::{theme::ColorfulTheme, Confirm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResetScope {
    Daily,
    Weekly,
    All,
}

#[derive(Debug, Args)]
pub struct ResetArgs {
    #[arg(value_enum)]
    scope: ResetScope,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    yes: bool,
}

pub async fn cmd(args: ResetArgs) -> Result<()> {
    let store = Domains::new()?;
    match args.scope {
        ResetScope::Daily => reset_period(&store, Period::Daily).await?,
        ResetScope::Weekly => reset_period(&store, Period::Weekly).await?,
        ResetScope::All => {
            let confirmed = args.yes
                || Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt(Message::ConfirmResetAll.to_string())
                    .default(false)
                    .interact()?;
            if !confirmed {
                msg_info!(Message::OperationCancelled);
                return Ok(());
            }
            reset_all(&store).await?;
        }
    }

    msg_success!(Message::DataReset(format!("{:?}", args.scope)));
    Ok(())
}

/// Zeroes the current `period` bucket of every record.
pub async fn reset_period(store: &dyn DomainStore, period: Period) -> Result<()> {
    let now = Utc::now();
    for domain in store.list().await?.into_keys() {
        store
            .update_existing(&domain, Box::new(move |record| record.reset_period(period, now)))
            .await?;
    }
    Ok(())
}

/// Deletes every record.
pub async fn reset_all(store: &dyn DomainStore) -> Result<()> {
    for domain in store.list().await?.into_keys() {
        store.remove(&domain).await?;
    }
    Ok(())
}
