//! Sets the daily and weekly limits of a domain.

use crate::db::{domains::Domains, DomainStore};
use crate::libs::domain::Limits;
use crate::libs::messages::Message;
use crate::libs::resource::normalize_domain;
use crate::{msg_error_anyhow, msg_success};
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct LimitArgs {
    /// Domain to limit, e.g. youtube.com
    domain: String,

    /// Daily limit in minutes (0 removes it)
    #[arg(long, short, default_value_t = 0)]
    daily: u64,

    /// Weekly limit in minutes (0 removes it)
    #[arg(long, short, default_value_t = 0)]
    weekly: u64,
}

pub async fn cmd(args: LimitArgs) -> Result<()> {
    let domain = normalize_domain(&args.domain).map_err(|_| msg_error_anyhow!(Message::InvalidDomain(args.domain.clone())))?;
    let limits = Limits::from_minutes(args.daily, args.weekly)?;

    Domains::new()?.update(&domain, Box::new(move |record| record.limits = limits)).await?;

    msg_success!(Message::LimitsUpdated(domain));
    Ok(())
}
