use crate::db::{DomainStore, RecordEdit};
use crate::libs::domain::DomainRecord;
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// In-process [`DomainStore`]. Records live for the lifetime of the value.
#[derive(Default)]
pub struct MemoryDomains {
    records: Mutex<BTreeMap<String, DomainRecord>>,
}

impl MemoryDomains {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DomainStore for MemoryDomains {
    async fn read(&self, domain: &str) -> Result<Option<DomainRecord>> {
        Ok(self.records.lock().get(domain).cloned())
    }

    async fn write(&self, domain: &str, record: &DomainRecord) -> Result<()> {
        self.records.lock().insert(domain.to_string(), record.clone());
        Ok(())
    }

    async fn update(&self, domain: &str, edit: RecordEdit) -> Result<DomainRecord> {
        let mut records = self.records.lock();
        let record = records.entry(domain.to_string()).or_default();
        edit(record);
        Ok(record.clone())
    }

    async fn update_existing(&self, domain: &str, edit: RecordEdit) -> Result<Option<DomainRecord>> {
        let mut records = self.records.lock();
        Ok(records.get_mut(domain).map(|record| {
            edit(record);
            record.clone()
        }))
    }

    async fn list(&self) -> Result<BTreeMap<String, DomainRecord>> {
        Ok(self.records.lock().clone())
    }

    async fn remove(&self, domain: &str) -> Result<bool> {
        Ok(self.records.lock().remove(domain).is_some())
    }
}
