//! Persistence layer for per-domain usage records.
//!
//! The engine only needs a key-value capability with read, write and an atomic
//! read-modify-write merge, expressed by [`DomainStore`]. Two implementations
//! ship with the crate:
//!
//! - [`domains::Domains`]: one JSON document per domain in SQLite, used by the
//!   CLI and the watcher.
//! - [`memory::MemoryDomains`]: in-process map, for embedding and tests.
//!
//! ```rust,no_run
//! use timeup::db::{domains::Domains, DomainStore};
//! use chrono::Utc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let store = Domains::new()?;
//! let record = store.update("example.com", Box::new(|record| record.credit(5, Utc::now()))).await?;
//! println!("{}s total", record.total_time);
//! # Ok(())
//! # }
//! ```

use crate::libs::domain::DomainRecord;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub mod db;
pub mod domains;
pub mod memory;

/// Mutation applied to one record inside [`DomainStore::update`].
pub type RecordEdit = Box<dyn FnOnce(&mut DomainRecord) + Send>;

#[async_trait]
pub trait DomainStore: Send + Sync {
    async fn read(&self, domain: &str) -> Result<Option<DomainRecord>>;

    async fn write(&self, domain: &str, record: &DomainRecord) -> Result<()>;

    /// Reads the current record (or a fresh one), applies `edit` and writes it back
    /// as one atomic step. Returns the record as stored.
    async fn update(&self, domain: &str, edit: RecordEdit) -> Result<DomainRecord>;

    /// Like [`update`](DomainStore::update), but leaves missing records missing.
    /// Returns `None` without writing when `domain` has no record.
    async fn update_existing(&self, domain: &str, edit: RecordEdit) -> Result<Option<DomainRecord>>;

    async fn list(&self) -> Result<BTreeMap<String, DomainRecord>>;

    /// Deletes a record. Returns whether it existed.
    async fn remove(&self, domain: &str) -> Result<bool>;
}
