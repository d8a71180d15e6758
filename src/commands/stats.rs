//! Per-domain usage table.

use crate::db::{domains::Domains, DomainStore};
use crate::libs::domain::day_key;
use crate::libs::messages::Message;
use crate::libs::view::{StatsRow, View};
use crate::{msg_info, msg_print};
use anyhow::Result;
use chrono::Utc;
use clap::Args;

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Show only domains with time recorded today
    #[arg(long, short)]
    today: bool,
}

pub async fn cmd(args: StatsArgs) -> Result<()> {
    let now = Utc::now();
    let records = Domains::new()?.list().await?;

    let mut rows = StatsRow::collect(&records, now);
    if args.today {
        rows.retain(|row| row.today > 0);
    }
    if rows.is_empty() {
        msg_info!(Message::NoDomainsTracked);
        return Ok(());
    }

    msg_print!(Message::StatsHeader(day_key(now)), true);
    View::stats(&rows)?;
    Ok(())
}
