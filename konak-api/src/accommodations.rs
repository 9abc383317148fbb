use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use konak_core::{authorize, Action, BulkOutcome, ExportProjection, Page, Principal};
use konak_ledger::{
    AccommodationDraft, AccommodationRecord, AccommodationSummary, StayStatus, TransferReceipt,
    TransferRequest, ACCOMMODATION_SEARCH_FIELDS,
};
use konak_shared::events::ChangeKind;
use uuid::Uuid;

use crate::error::AppError;
use crate::listing::{self, Columns, ListParams};
use crate::records::{self, BulkGates, BulkRequest, VersionQuery};
use crate::state::AppState;

const COLUMNS: Columns = Columns {
    search: ACCOMMODATION_SEARCH_FIELDS,
    equals: &[
        "city",
        "country",
        "hotel_name",
        "organization_name",
        "room_type",
        "board_type",
        "status",
        "individual",
        "transferred",
    ],
    ranges: &["nightly_rate", "total_charge", "nights"],
    sortable: &[
        "guest_name",
        "hotel_name",
        "organization_name",
        "check_in",
        "check_out",
        "nights",
        "nightly_rate",
        "total_charge",
        "created_at",
    ],
};

const GATES: BulkGates = BulkGates {
    delete: Action::DeleteAccommodation,
    set_status: Action::EditAccommodation,
    export: Action::ViewAccommodation,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accommodations", get(list_accommodations).post(create_accommodation))
        .route("/accommodations/summary", get(accommodation_summary))
        .route("/accommodations/export", get(export_accommodations))
        .route("/accommodations/bulk", post(bulk_accommodations))
        .route("/accommodations/transfer-to-sales", post(transfer_to_sales))
        .route(
            "/accommodations/{id}",
            get(get_accommodation).put(update_accommodation).delete(delete_accommodation),
        )
}

/// GET /v1/accommodations
async fn list_accommodations(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<Page<AccommodationRecord>>, AppError> {
    authorize(&principal, Action::ViewAccommodation)?;
    let params = ListParams::parse(&raw, &COLUMNS, &state.listing, &[])?;
    Ok(Json(params.page_of(state.accommodations.list().await?)))
}

/// GET /v1/accommodations/summary?day=YYYY-MM-DD
///
/// Takes the same filters as the list; `day` picks the date for the presence count.
async fn accommodation_summary(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<AccommodationSummary>, AppError> {
    authorize(&principal, Action::ViewAccommodation)?;
    let params = ListParams::parse(&raw, &COLUMNS, &state.listing, &["day"])?;
    let day = match raw.get("day") {
        Some(day) => listing::date("day", day)?,
        None => chrono::Utc::now().date_naive(),
    };
    let records = params.filtered(state.accommodations.list().await?);
    Ok(Json(AccommodationSummary::build(&records, day)))
}

/// GET /v1/accommodations/export
async fn export_accommodations(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ExportProjection>, AppError> {
    authorize(&principal, Action::ViewAccommodation)?;
    let params = ListParams::parse(&raw, &COLUMNS, &state.listing, &[])?;
    Ok(Json(params.export_of(state.accommodations.list().await?)))
}

/// POST /v1/accommodations
async fn create_accommodation(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(draft): Json<AccommodationDraft>,
) -> Result<(StatusCode, Json<AccommodationRecord>), AppError> {
    authorize(&principal, Action::EditAccommodation)?;
    let record = state
        .accommodations
        .create(AccommodationRecord::from_draft(draft)?)
        .await?;
    tracing::info!(
        accommodation_id = %record.id,
        nights = record.nights,
        total = %record.total_charge,
        "accommodation recorded"
    );
    records::record_changed(&record, ChangeKind::Created, &principal);
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /v1/accommodations/{id}
async fn get_accommodation(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccommodationRecord>, AppError> {
    authorize(&principal, Action::ViewAccommodation)?;
    Ok(Json(records::load(&*state.accommodations, id).await?))
}

/// PUT /v1/accommodations/{id}
async fn update_accommodation(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Query(version): Query<VersionQuery>,
    Json(draft): Json<AccommodationDraft>,
) -> Result<Json<AccommodationRecord>, AppError> {
    authorize(&principal, Action::EditAccommodation)?;
    let mut record = records::load(&*state.accommodations, id).await?;
    record.apply(draft)?;
    let record = state.accommodations.update(record, version.expected_version).await?;
    records::record_changed(&record, ChangeKind::Updated, &principal);
    Ok(Json(record))
}

/// DELETE /v1/accommodations/{id}
async fn delete_accommodation(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    authorize(&principal, Action::DeleteAccommodation)?;
    state.accommodations.delete(id).await?;
    records::record_deleted::<AccommodationRecord>(id, &principal);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/accommodations/bulk
async fn bulk_accommodations(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<BulkRequest<StayStatus>>,
) -> Result<Json<BulkOutcome>, AppError> {
    let outcome = records::run_bulk(&*state.accommodations, &principal, &GATES, request).await?;
    Ok(Json(outcome))
}

/// POST /v1/accommodations/transfer-to-sales
async fn transfer_to_sales(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<TransferReceipt>), AppError> {
    authorize(&principal, Action::TransferToSales)?;
    let receipt = state.ledger.transfer_to_sales(request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
