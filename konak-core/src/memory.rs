use async_trait::async_trait;
use tokio::sync::{RwLock, RwLockWriteGuard};
use uuid::Uuid;

use crate::repository::{check_version, Record, Repository};
use crate::{CoreError, CoreResult};

/// Insertion-ordered in-process store. Used by tests and when no database is configured.
pub struct MemoryRepository<T> {
    records: RwLock<Vec<T>>,
}

impl<T: Record> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn with_records(records: Vec<T>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Exclusive access for multi-record operations that must not interleave with other writers.
    pub async fn write(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.records.write().await
    }
}

impl<T: Record> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Record> Repository<T> for MemoryRepository<T> {
    async fn list(&self) -> CoreResult<Vec<T>> {
        Ok(self.records.read().await.clone())
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<T>> {
        Ok(self.records.read().await.iter().find(|r| r.id() == id).cloned())
    }

    async fn create(&self, mut record: T) -> CoreResult<T> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id() == record.id()) {
            return Err(CoreError::conflict(format!("{} {} already exists", T::KIND, record.id())));
        }
        record.set_version(1);
        records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, mut record: T, expected_version: Option<i64>) -> CoreResult<T> {
        let mut records = self.records.write().await;
        let stored = records
            .iter_mut()
            .find(|r| r.id() == record.id())
            .ok_or_else(|| CoreError::not_found(T::KIND, record.id()))?;

        check_version(stored, expected_version)?;
        record.set_version(stored.version() + 1);
        *stored = record.clone();
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> CoreResult<()> {
        let mut records = self.records.write().await;
        let idx = records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| CoreError::not_found(T::KIND, id))?;

        check_version(&records[idx], None)?;
        records.remove(idx);
        Ok(())
    }

    async fn bulk_delete(&self, ids: &[Uuid]) -> CoreResult<u64> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.is_locked() || !ids.contains(&r.id()));
        Ok((before - records.len()) as u64)
    }
}
