use crate::db::db::Db;
use crate::db::{DomainStore, RecordEdit};
use crate::libs::domain::DomainRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

const SCHEMA_DOMAINS: &str = "CREATE TABLE IF NOT EXISTS domains (
    domain TEXT PRIMARY KEY,
    record TEXT NOT NULL
);";
const SELECT_RECORD: &str = "SELECT record FROM domains WHERE domain = ?1";
const SELECT_ALL: &str = "SELECT domain, record FROM domains ORDER BY domain";
const UPSERT_RECORD: &str = "INSERT INTO domains (domain, record) VALUES (?1, ?2)
    ON CONFLICT(domain) DO UPDATE SET record = excluded.record";
const DELETE_RECORD: &str = "DELETE FROM domains WHERE domain = ?1";

/// SQLite-backed [`DomainStore`]. Each record is one JSON document keyed by domain.
///
/// Queries run on tokio's blocking pool so the event loop never waits on disk.
#[derive(Clone)]
pub struct Domains {
    conn: Arc<Mutex<Connection>>,
}

impl Domains {
    pub fn new() -> Result<Self> {
        Self::from_db(Db::new()?)
    }

    pub fn open(path: &Path) -> Result<Self> {
        Self::from_db(Db::open(path)?)
    }

    fn from_db(db: Db) -> Result<Self> {
        db.conn.execute(SCHEMA_DOMAINS, [])?;
        Ok(Domains {
            conn: Arc::new(Mutex::new(db.conn)),
        })
    }

    async fn blocking<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            job(&mut guard)
        })
        .await?
    }
}

fn fetch(conn: &Connection, domain: &str) -> Result<Option<DomainRecord>> {
    let raw: Option<String> = conn.query_row(SELECT_RECORD, [domain], |row| row.get(0)).optional()?;
    raw.map(|json| serde_json::from_str(&json).with_context(|| format!("corrupted record for {}", domain)))
        .transpose()
}

fn store(conn: &Connection, domain: &str, record: &DomainRecord) -> Result<()> {
    let json = serde_json::to_string(record)?;
    conn.execute(UPSERT_RECORD, params![domain, json])?;
    Ok(())
}

#[async_trait]
impl DomainStore for Domains {
    async fn read(&self, domain: &str) -> Result<Option<DomainRecord>> {
        let domain = domain.to_string();
        self.blocking(move |conn| fetch(conn, &domain)).await
    }

    async fn write(&self, domain: &str, record: &DomainRecord) -> Result<()> {
        let domain = domain.to_string();
        let record = record.clone();
        self.blocking(move |conn| store(conn, &domain, &record)).await
    }

    async fn update(&self, domain: &str, edit: RecordEdit) -> Result<DomainRecord> {
        let domain = domain.to_string();
        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut record = fetch(&tx, &domain)?.unwrap_or_default();
            edit(&mut record);
            store(&tx, &domain, &record)?;
            tx.commit()?;
            Ok(record)
        })
        .await
    }

    async fn update_existing(&self, domain: &str, edit: RecordEdit) -> Result<Option<DomainRecord>> {
        let domain = domain.to_string();
        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(mut record) = fetch(&tx, &domain)? else {
                return Ok(None);
            };
            edit(&mut record);
            store(&tx, &domain, &record)?;
            tx.commit()?;
            Ok(Some(record))
        })
        .await
    }

    async fn list(&self) -> Result<BTreeMap<String, DomainRecord>> {
        self.blocking(|conn| {
            let mut stmt = conn.prepare(SELECT_ALL)?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
            let mut records = BTreeMap::new();
            for row in rows {
                let (domain, json) = row?;
                match serde_json::from_str(&json) {
                    Ok(record) => {
                        records.insert(domain, record);
                    }
                    Err(e) => tracing::warn!(domain = %domain, "skipping corrupted record: {}", e),
                }
            }
            Ok(records)
        })
        .await
    }

    async fn remove(&self, domain: &str) -> Result<bool> {
        let domain = domain.to_string();
        self.blocking(move |conn| Ok(conn.execute(DELETE_RECORD, [&domain])? > 0)).await
    }
}
