use crate::db::{domains::Domains, DomainStore};
use crate::libs::messages::Message;
use crate::libs::resource::normalize_domain;
use crate::{msg_error_anyhow, msg_success, msg_warning};
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// Domain whose data should be deleted
    domain: String,
}

pub async fn cmd(args: RemoveArgs) -> Result<()> {
    let domain = normalize_domain(&args.domain).map_err(|_| msg_error_anyhow!(Message::InvalidDomain(args.domain.clone())))?;

    if Domains::new()?.remove(&domain).await? {
        msg_success!(Message::DomainRemoved(domain));
    } else {
        msg_warning!(Message::DomainNotFound(domain));
    }
    Ok(())
}
