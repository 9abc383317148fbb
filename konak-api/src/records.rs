use konak_core::bulk::{self, BulkOperation, BulkOutcome, Exportable, StatusBearing};
use konak_core::{authorize, Action, CoreError, Principal, Record, Repository};
use konak_shared::events::{self, BulkCompletedEvent, ChangeKind, RecordChangedEvent};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct VersionQuery {
    /// Opt-in optimistic concurrency; omit for last-write-wins.
    pub expected_version: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest<S> {
    pub ids: Vec<Uuid>,
    pub operation: BulkOperation<S>,
    #[serde(default)]
    pub confirm: bool,
}

/// Action checked for each kind of bulk operation on one entity.
pub struct BulkGates {
    pub delete: Action,
    pub set_status: Action,
    pub export: Action,
}

pub async fn load<T: Record>(repo: &dyn Repository<T>, id: Uuid) -> Result<T, AppError> {
    repo.get(id)
        .await?
        .ok_or_else(|| CoreError::not_found(T::KIND, id).into())
}

pub fn record_changed<T: Record>(record: &T, change: ChangeKind, actor: &Principal) {
    announce(T::KIND, record.id(), record.version(), change, actor);
}

pub fn record_deleted<T: Record>(id: Uuid, actor: &Principal) {
    announce(T::KIND, id, 0, ChangeKind::Deleted, actor);
}

fn announce(entity: &str, record_id: Uuid, version: i64, change: ChangeKind, actor: &Principal) {
    let event = RecordChangedEvent {
        entity: entity.to_string(),
        record_id,
        version,
        change,
        actor_id: actor.user_id,
        timestamp: events::now_ts(),
    };
    events::publish(events::TOPIC_RECORDS, &record_id.to_string(), &event);
}

/// Authorizes and runs a bulk request, then reports the outcome as a domain event.
pub async fn run_bulk<T>(
    repo: &dyn Repository<T>,
    principal: &Principal,
    gates: &BulkGates,
    request: BulkRequest<T::Status>,
) -> Result<BulkOutcome, AppError>
where
    T: StatusBearing + Exportable,
{
    let action = match request.operation {
        BulkOperation::Delete => gates.delete,
        BulkOperation::SetStatus(_) => gates.set_status,
        BulkOperation::Export => gates.export,
    };
    authorize(principal, action)?;

    let outcome = bulk::execute::<T, _>(repo, &request.ids, &request.operation, request.confirm).await?;

    bulk_completed(T::KIND, request.operation.label(), &outcome, principal);

    Ok(outcome)
}

pub fn bulk_completed(entity: &str, operation: &str, outcome: &BulkOutcome, actor: &Principal) {
    let event = BulkCompletedEvent {
        entity: entity.to_string(),
        operation: operation.to_string(),
        succeeded: outcome.succeeded,
        failed: outcome.failed,
        skipped: outcome.skipped,
        actor_id: actor.user_id,
        timestamp: events::now_ts(),
    };
    events::publish(events::TOPIC_BULK, entity, &event);
}
