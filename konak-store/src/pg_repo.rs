use std::marker::PhantomData;

use async_trait::async_trait;
use konak_core::repository::{check_version, Record, Repository};
use konak_core::{CoreError, CoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Postgres-backed repository storing each record as a JSONB body in the `T::KIND` table.
pub struct PgRepository<T> {
    pool: PgPool,
    _record: PhantomData<fn() -> T>,
}

impl<T> PgRepository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, _record: PhantomData }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct RecordRow {
    version: i64,
    body: Value,
}

impl RecordRow {
    pub(crate) fn decode<T: Record + DeserializeOwned>(self) -> CoreResult<T> {
        let mut record: T = serde_json::from_value(self.body)
            .map_err(|e| CoreError::Remote(format!("corrupt {} row: {}", T::KIND, e)))?;
        record.set_version(self.version);
        Ok(record)
    }
}

pub(crate) fn remote(err: sqlx::Error) -> CoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            CoreError::conflict(db.message().to_string())
        }
        _ => {
            tracing::error!("database error: {}", err);
            CoreError::Remote(err.to_string())
        }
    }
}

fn encode<T: Serialize>(record: &T) -> CoreResult<Value> {
    serde_json::to_value(record).map_err(|e| CoreError::Remote(e.to_string()))
}

/// Loads rows for `ids` and holds their row locks until the transaction ends.
pub(crate) async fn lock_rows<T: Record + DeserializeOwned>(
    tx: &mut Transaction<'_, Postgres>,
    ids: &[Uuid],
) -> CoreResult<Vec<T>> {
    let sql = format!(
        "SELECT version, body FROM {} WHERE id = ANY($1) ORDER BY seq FOR UPDATE",
        T::KIND
    );
    let rows: Vec<RecordRow> = sqlx::query_as(&sql)
        .bind(ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(remote)?;
    rows.into_iter().map(RecordRow::decode).collect()
}

pub(crate) async fn insert_row<T: Record + Serialize>(
    tx: &mut Transaction<'_, Postgres>,
    record: &T,
) -> CoreResult<()> {
    let sql = format!(
        "INSERT INTO {} (id, version, locked, body) VALUES ($1, $2, $3, $4) ON CONFLICT (id) DO NOTHING",
        T::KIND
    );
    let result = sqlx::query(&sql)
        .bind(record.id())
        .bind(record.version())
        .bind(record.is_locked())
        .bind(encode(record)?)
        .execute(&mut **tx)
        .await
        .map_err(remote)?;

    if result.rows_affected() == 0 {
        return Err(CoreError::conflict(format!("{} {} already exists", T::KIND, record.id())));
    }
    Ok(())
}

pub(crate) async fn write_row<T: Record + Serialize>(
    tx: &mut Transaction<'_, Postgres>,
    record: &T,
) -> CoreResult<()> {
    let sql = format!(
        "UPDATE {} SET version = $2, locked = $3, body = $4, updated_at = NOW() WHERE id = $1",
        T::KIND
    );
    sqlx::query(&sql)
        .bind(record.id())
        .bind(record.version())
        .bind(record.is_locked())
        .bind(encode(record)?)
        .execute(&mut **tx)
        .await
        .map_err(remote)?;
    Ok(())
}

pub(crate) async fn delete_row(
    tx: &mut Transaction<'_, Postgres>,
    kind: &str,
    id: Uuid,
) -> CoreResult<()> {
    let sql = format!("DELETE FROM {} WHERE id = $1", kind);
    sqlx::query(&sql)
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(remote)?;
    Ok(())
}

#[async_trait]
impl<T> Repository<T> for PgRepository<T>
where
    T: Record + Serialize + DeserializeOwned,
{
    async fn list(&self) -> CoreResult<Vec<T>> {
        let sql = format!("SELECT version, body FROM {} ORDER BY seq", T::KIND);
        let rows: Vec<RecordRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(remote)?;
        rows.into_iter().map(RecordRow::decode).collect()
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<T>> {
        let sql = format!("SELECT version, body FROM {} WHERE id = $1", T::KIND);
        let row: Option<RecordRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(remote)?;
        row.map(RecordRow::decode).transpose()
    }

    async fn create(&self, mut record: T) -> CoreResult<T> {
        record.set_version(1);
        let mut tx = self.pool.begin().await.map_err(remote)?;
        insert_row(&mut tx, &record).await?;
        tx.commit().await.map_err(remote)?;
        Ok(record)
    }

    async fn update(&self, mut record: T, expected_version: Option<i64>) -> CoreResult<T> {
        let mut tx = self.pool.begin().await.map_err(remote)?;
        let stored: T = lock_rows(&mut tx, &[record.id()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::not_found(T::KIND, record.id()))?;

        check_version(&stored, expected_version)?;
        record.set_version(stored.version() + 1);
        write_row(&mut tx, &record).await?;
        tx.commit().await.map_err(remote)?;
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(remote)?;
        let stored: T = lock_rows(&mut tx, &[id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::not_found(T::KIND, id))?;

        check_version(&stored, None)?;
        delete_row(&mut tx, T::KIND, id).await?;
        tx.commit().await.map_err(remote)?;
        Ok(())
    }

    async fn bulk_delete(&self, ids: &[Uuid]) -> CoreResult<u64> {
        let sql = format!("DELETE FROM {} WHERE id = ANY($1) AND NOT locked", T::KIND);
        let result = sqlx::query(&sql)
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(remote)?;
        Ok(result.rows_affected())
    }
}
