use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use konak_catalog::{Hotel, HotelDraft, RatingUpdate, HOTEL_SEARCH_FIELDS};
use konak_core::{authorize, Action, BulkOutcome, CoreError, ExportProjection, Page, Principal};
use konak_shared::events::ChangeKind;
use uuid::Uuid;

use crate::error::AppError;
use crate::listing::{Columns, ListParams};
use crate::records::{self, BulkGates, BulkRequest, ConfirmQuery, VersionQuery};
use crate::state::AppState;

const COLUMNS: Columns = Columns {
    search: HOTEL_SEARCH_FIELDS,
    equals: &["status", "city", "country", "star_rating"],
    ranges: &["star_rating", "score"],
    sortable: &["name", "city", "country", "star_rating", "score", "status", "created_at"],
};

const GATES: BulkGates = BulkGates {
    delete: Action::DeleteHotels,
    set_status: Action::EditHotels,
    export: Action::ViewHotels,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/hotels", get(list_hotels).post(create_hotel))
        .route("/hotels/export", get(export_hotels))
        .route("/hotels/bulk", post(bulk_hotels))
        .route("/hotels/{id}", get(get_hotel).put(update_hotel).delete(delete_hotel))
        .route("/hotels/{id}/rating", post(rate_hotel))
}

/// GET /v1/hotels
async fn list_hotels(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<Page<Hotel>>, AppError> {
    authorize(&principal, Action::ViewHotels)?;
    let params = ListParams::parse(&raw, &COLUMNS, &state.listing, &[])?;
    Ok(Json(params.page_of(state.hotels.list().await?)))
}

/// GET /v1/hotels/export
async fn export_hotels(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ExportProjection>, AppError> {
    authorize(&principal, Action::ViewHotels)?;
    let params = ListParams::parse(&raw, &COLUMNS, &state.listing, &[])?;
    Ok(Json(params.export_of(state.hotels.list().await?)))
}

/// POST /v1/hotels
async fn create_hotel(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(draft): Json<HotelDraft>,
) -> Result<(StatusCode, Json<Hotel>), AppError> {
    authorize(&principal, Action::EditHotels)?;
    let hotel = state.hotels.create(Hotel::from_draft(draft)?).await?;
    tracing::info!(hotel_id = %hotel.id, name = %hotel.name, "hotel created");
    records::record_changed(&hotel, ChangeKind::Created, &principal);
    Ok((StatusCode::CREATED, Json(hotel)))
}

/// GET /v1/hotels/{id}
async fn get_hotel(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<Hotel>, AppError> {
    authorize(&principal, Action::ViewHotels)?;
    Ok(Json(records::load(&*state.hotels, id).await?))
}

/// PUT /v1/hotels/{id}
async fn update_hotel(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Query(version): Query<VersionQuery>,
    Json(draft): Json<HotelDraft>,
) -> Result<Json<Hotel>, AppError> {
    authorize(&principal, Action::EditHotels)?;
    let mut hotel = records::load(&*state.hotels, id).await?;
    hotel.apply(draft)?;
    let hotel = state.hotels.update(hotel, version.expected_version).await?;
    records::record_changed(&hotel, ChangeKind::Updated, &principal);
    Ok(Json(hotel))
}

/// POST /v1/hotels/{id}/rating
async fn rate_hotel(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Query(version): Query<VersionQuery>,
    Json(rating): Json<RatingUpdate>,
) -> Result<Json<Hotel>, AppError> {
    authorize(&principal, Action::EditHotels)?;
    let mut hotel = records::load(&*state.hotels, id).await?;
    hotel.rate(rating)?;
    let hotel = state.hotels.update(hotel, version.expected_version).await?;
    records::record_changed(&hotel, ChangeKind::Updated, &principal);
    Ok(Json(hotel))
}

/// DELETE /v1/hotels/{id}?confirm=true
async fn delete_hotel(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Query(confirm): Query<ConfirmQuery>,
) -> Result<StatusCode, AppError> {
    authorize(&principal, Action::DeleteHotels)?;
    if !confirm.confirm {
        return Err(CoreError::validation("deleting a hotel requires confirm=true").into());
    }
    state.hotels.delete(id).await?;
    tracing::info!(hotel_id = %id, "hotel deleted");
    records::record_deleted::<Hotel>(id, &principal);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/hotels/bulk
async fn bulk_hotels(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<BulkRequest<konak_catalog::HotelStatus>>,
) -> Result<Json<BulkOutcome>, AppError> {
    let outcome = records::run_bulk(&*state.hotels, &principal, &GATES, request).await?;
    Ok(Json(outcome))
}
