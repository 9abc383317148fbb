use async_trait::async_trait;
use uuid::Uuid;

use crate::CoreResult;

/// A stored back-office record.
pub trait Record: Clone + Send + Sync + 'static {
    /// Entity family name; also the backing table name.
    const KIND: &'static str;

    fn id(&self) -> Uuid;

    /// Write counter, starts at 1 and grows by one per update.
    fn version(&self) -> i64;

    fn set_version(&mut self, version: i64);

    /// Locked records refuse generic update and delete, and cannot be bulk-selected.
    fn is_locked(&self) -> bool {
        false
    }
}

/// CRUD surface over one entity family.
///
/// `update` takes an optional expected version: when present a stale write is a
/// `CoreError::Conflict`, when absent the last write wins.
#[async_trait]
pub trait Repository<T: Record>: Send + Sync {
    async fn list(&self) -> CoreResult<Vec<T>>;

    async fn get(&self, id: Uuid) -> CoreResult<Option<T>>;

    async fn create(&self, record: T) -> CoreResult<T>;

    async fn update(&self, record: T, expected_version: Option<i64>) -> CoreResult<T>;

    async fn delete(&self, id: Uuid) -> CoreResult<()>;

    /// Deletes every unlocked record among `ids`; returns how many were removed.
    async fn bulk_delete(&self, ids: &[Uuid]) -> CoreResult<u64>;
}

/// Shared version check used by every repository implementation.
pub fn check_version<T: Record>(stored: &T, expected_version: Option<i64>) -> CoreResult<()> {
    if stored.is_locked() {
        return Err(crate::CoreError::conflict(format!(
            "{} {} is locked",
            T::KIND,
            stored.id()
        )));
    }
    match expected_version {
        Some(v) if v != stored.version() => Err(crate::CoreError::conflict(format!(
            "{} {} was modified (version {} expected, found {})",
            T::KIND,
            stored.id(),
            v,
            stored.version()
        ))),
        _ => Ok(()),
    }
}
