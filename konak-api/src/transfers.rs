use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use konak_core::{authorize, Action, BulkOutcome, ExportProjection, Page, Principal, StatusBearing};
use konak_dispatch::{TransferDraft, TransferOrder, TransferStatus, TRANSFER_SEARCH_FIELDS};
use konak_shared::events::ChangeKind;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::listing::{Columns, ListParams};
use crate::records::{self, BulkGates, BulkRequest, VersionQuery};
use crate::state::AppState;

const COLUMNS: Columns = Columns {
    search: TRANSFER_SEARCH_FIELDS,
    equals: &["status", "billing", "full_day_charter", "departure_date"],
    ranges: &["price", "passenger_count"],
    sortable: &[
        "departure_date",
        "departure_time",
        "origin",
        "destination",
        "passenger_count",
        "price",
        "status",
        "created_at",
    ],
};

const GATES: BulkGates = BulkGates {
    delete: Action::DeleteTransfers,
    set_status: Action::DispatchTransfers,
    export: Action::ViewTransfers,
};

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: TransferStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transfers", get(list_transfers).post(create_transfer))
        .route("/transfers/export", get(export_transfers))
        .route("/transfers/bulk", post(bulk_transfers))
        .route("/transfers/{id}", get(get_transfer).put(update_transfer).delete(delete_transfer))
        .route("/transfers/{id}/status", post(change_status))
}

/// GET /v1/transfers
async fn list_transfers(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<Page<TransferOrder>>, AppError> {
    authorize(&principal, Action::ViewTransfers)?;
    let params = ListParams::parse(&raw, &COLUMNS, &state.listing, &[])?;
    Ok(Json(params.page_of(state.transfers.list().await?)))
}

/// GET /v1/transfers/export
async fn export_transfers(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ExportProjection>, AppError> {
    authorize(&principal, Action::ViewTransfers)?;
    let params = ListParams::parse(&raw, &COLUMNS, &state.listing, &[])?;
    Ok(Json(params.export_of(state.transfers.list().await?)))
}

/// POST /v1/transfers
async fn create_transfer(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(draft): Json<TransferDraft>,
) -> Result<(StatusCode, Json<TransferOrder>), AppError> {
    authorize(&principal, Action::DispatchTransfers)?;
    let order = state.transfers.create(TransferOrder::from_draft(draft)?).await?;
    tracing::info!(
        transfer_id = %order.id,
        departure = %order.departure_date,
        passengers = order.passenger_count,
        "transfer order created"
    );
    records::record_changed(&order, ChangeKind::Created, &principal);
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /v1/transfers/{id}
async fn get_transfer(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransferOrder>, AppError> {
    authorize(&principal, Action::ViewTransfers)?;
    Ok(Json(records::load(&*state.transfers, id).await?))
}

/// PUT /v1/transfers/{id}
async fn update_transfer(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Query(version): Query<VersionQuery>,
    Json(draft): Json<TransferDraft>,
) -> Result<Json<TransferOrder>, AppError> {
    authorize(&principal, Action::DispatchTransfers)?;
    let mut order = records::load(&*state.transfers, id).await?;
    order.apply(draft)?;
    let order = state.transfers.update(order, version.expected_version).await?;
    records::record_changed(&order, ChangeKind::Updated, &principal);
    Ok(Json(order))
}

/// POST /v1/transfers/{id}/status
async fn change_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Query(version): Query<VersionQuery>,
    Json(change): Json<StatusChange>,
) -> Result<Json<TransferOrder>, AppError> {
    authorize(&principal, Action::DispatchTransfers)?;
    let mut order = records::load(&*state.transfers, id).await?;
    let from = order.status;
    order.transition(change.status)?;
    let order = state.transfers.update(order, version.expected_version).await?;
    tracing::info!(transfer_id = %id, from = from.as_str(), to = order.status.as_str(), "transfer status changed");
    records::record_changed(&order, ChangeKind::Updated, &principal);
    Ok(Json(order))
}

/// DELETE /v1/transfers/{id}
async fn delete_transfer(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    authorize(&principal, Action::DeleteTransfers)?;
    state.transfers.delete(id).await?;
    records::record_deleted::<TransferOrder>(id, &principal);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/transfers/bulk
async fn bulk_transfers(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<BulkRequest<TransferStatus>>,
) -> Result<Json<BulkOutcome>, AppError> {
    let outcome = records::run_bulk(&*state.transfers, &principal, &GATES, request).await?;
    Ok(Json(outcome))
}
