use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::query::Fields;
use crate::repository::{Record, Repository};
use crate::{CoreError, CoreResult};

/// Records that move through a fixed set of statuses.
pub trait StatusBearing: Record {
    type Status: Clone + Send + Sync + std::fmt::Debug;

    /// Moves to `status`, refusing transitions the entity's lifecycle forbids.
    fn transition(&mut self, status: Self::Status) -> CoreResult<()>;
}

/// Records that can be projected into a tabular export.
pub trait Exportable: Fields {
    const COLUMNS: &'static [&'static str];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkOperation<S> {
    Delete,
    SetStatus(S),
    Export,
}

impl<S> BulkOperation<S> {
    /// Everything except export changes stored data and needs a confirmation first.
    pub fn is_destructive(&self) -> bool {
        !matches!(self, BulkOperation::Export)
    }

    pub fn label(&self) -> &'static str {
        match self {
            BulkOperation::Delete => "DELETE",
            BulkOperation::SetStatus(_) => "SET_STATUS",
            BulkOperation::Export => "EXPORT",
        }
    }
}

/// Column/row projection handed to the external spreadsheet and PDF formatters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportProjection {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportProjection {
    pub fn build<'a, T: Exportable + 'a>(records: impl IntoIterator<Item = &'a T>) -> Self {
        let rows = records
            .into_iter()
            .map(|r| {
                T::COLUMNS
                    .iter()
                    .map(|c| r.field(c).map(|v| v.to_string()).unwrap_or_default())
                    .collect()
            })
            .collect();

        Self {
            columns: T::COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFailure {
    pub id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub succeeded: usize,
    pub failed: usize,
    /// Locked records, excluded by business rule rather than by error.
    pub skipped: usize,
    pub failures: Vec<BulkFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportProjection>,
}

impl BulkOutcome {
    pub fn fail(&mut self, id: Uuid, err: CoreError) {
        tracing::warn!(%id, "bulk item failed: {}", err);
        self.failed += 1;
        self.failures.push(BulkFailure { id, reason: err.to_string() });
    }
}

/// Applies `operation` to each selected id independently.
///
/// Destructive operations require `confirmed`. One item failing never stops the
/// rest; the outcome counts successes, failures and locked records skipped.
/// Deletes are gathered and issued as one `bulk_delete` once every id is checked.
pub async fn execute<T, R>(
    repo: &R,
    ids: &[Uuid],
    operation: &BulkOperation<T::Status>,
    confirmed: bool,
) -> CoreResult<BulkOutcome>
where
    T: StatusBearing + Exportable,
    R: Repository<T> + ?Sized,
{
    if ids.is_empty() {
        return Err(CoreError::validation("no records selected"));
    }
    if operation.is_destructive() && !confirmed {
        return Err(CoreError::validation(format!(
            "bulk {} on {} {} requires confirmation",
            operation.label(),
            ids.len(),
            T::KIND
        )));
    }

    let mut outcome = BulkOutcome::default();
    let mut exported: Vec<T> = Vec::new();
    let mut doomed: Vec<Uuid> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for &id in ids.iter().filter(|id| seen.insert(**id)) {
        let record = match repo.get(id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                outcome.fail(id, CoreError::not_found(T::KIND, id));
                continue;
            }
            Err(e) => {
                outcome.fail(id, e);
                continue;
            }
        };

        if record.is_locked() && operation.is_destructive() {
            outcome.skipped += 1;
            continue;
        }

        let result = match operation {
            BulkOperation::Delete => {
                doomed.push(id);
                continue;
            }
            BulkOperation::SetStatus(status) => {
                let mut record = record;
                let version = record.version();
                match record.transition(status.clone()) {
                    Ok(()) => repo.update(record, Some(version)).await.map(|_| ()),
                    Err(e) => Err(e),
                }
            }
            BulkOperation::Export => {
                exported.push(record);
                Ok(())
            }
        };

        match result {
            Ok(()) => outcome.succeeded += 1,
            Err(e) => outcome.fail(id, e),
        }
    }

    if !doomed.is_empty() {
        delete_batch::<T, R>(repo, &doomed, &mut outcome).await;
    }

    if matches!(operation, BulkOperation::Export) {
        outcome.export = Some(ExportProjection::build(exported.iter()));
    }

    tracing::info!(
        kind = T::KIND,
        operation = operation.label(),
        succeeded = outcome.succeeded,
        failed = outcome.failed,
        skipped = outcome.skipped,
        "bulk operation finished"
    );

    Ok(outcome)
}

async fn delete_batch<T, R>(repo: &R, ids: &[Uuid], outcome: &mut BulkOutcome)
where
    T: Record,
    R: Repository<T> + ?Sized,
{
    match repo.bulk_delete(ids).await {
        Ok(removed) if removed as usize == ids.len() => outcome.succeeded += ids.len(),
        Ok(removed) => {
            // Something changed between the checks and the delete; report the survivors.
            outcome.succeeded += removed as usize;
            for &id in ids {
                if let Ok(Some(_)) = repo.get(id).await {
                    outcome.fail(id, CoreError::conflict(format!("{} {} was not deleted", T::KIND, id)));
                }
            }
        }
        Err(e) => {
            let reason = e.to_string();
            for &id in ids {
                outcome.fail(id, CoreError::Remote(reason.clone()));
            }
        }
    }
}
