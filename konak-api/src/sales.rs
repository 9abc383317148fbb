use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use konak_core::{authorize, Action, BulkOperation, BulkOutcome, CoreError, ExportProjection, Page, Principal, Record};
use konak_ledger::{Sale, SaleStatus, SALE_SEARCH_FIELDS};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::listing::{Columns, ListParams};
use crate::records::{self, BulkGates, BulkRequest};
use crate::state::AppState;

const COLUMNS: Columns = Columns {
    search: SALE_SEARCH_FIELDS,
    equals: &["status", "organization_name", "hotel_name"],
    ranges: &["unit_price", "total_amount", "nights"],
    sortable: &["created_at", "organization_name", "guest_name", "unit_price", "total_amount", "status"],
};

const GATES: BulkGates = BulkGates {
    delete: Action::DeleteSales,
    set_status: Action::EditSales,
    export: Action::ViewSales,
};

#[derive(Debug, Default, Deserialize)]
pub struct DeleteSaleQuery {
    #[serde(default)]
    pub return_to_pool: bool,
}

/// Sales bulk body: the shared bulk request plus what happens to the source stays.
#[derive(Debug, Deserialize)]
pub struct SalesBulkRequest {
    #[serde(flatten)]
    pub bulk: BulkRequest<SaleStatus>,
    #[serde(default = "returns_to_pool")]
    pub return_to_pool: bool,
}

fn returns_to_pool() -> bool {
    true
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sales", get(list_sales))
        .route("/sales/export", get(export_sales))
        .route("/sales/bulk", post(bulk_sales))
        .route("/sales/{id}", delete(delete_sale))
}

/// GET /v1/sales
async fn list_sales(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<Page<Sale>>, AppError> {
    authorize(&principal, Action::ViewSales)?;
    let params = ListParams::parse(&raw, &COLUMNS, &state.listing, &[])?;
    Ok(Json(params.page_of(state.sales.list().await?)))
}

/// GET /v1/sales/export
async fn export_sales(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ExportProjection>, AppError> {
    authorize(&principal, Action::ViewSales)?;
    let params = ListParams::parse(&raw, &COLUMNS, &state.listing, &[])?;
    Ok(Json(params.export_of(state.sales.list().await?)))
}

/// DELETE /v1/sales/{id}?return_to_pool=true
async fn delete_sale(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteSaleQuery>,
) -> Result<StatusCode, AppError> {
    authorize(&principal, Action::DeleteSales)?;
    state.ledger.delete_sale(id, query.return_to_pool).await?;
    records::record_deleted::<Sale>(id, &principal);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/sales/bulk
///
/// Deletes run sale by sale through the ledger so each source stay is released
/// together with its sale.
async fn bulk_sales(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<SalesBulkRequest>,
) -> Result<Json<BulkOutcome>, AppError> {
    let SalesBulkRequest { bulk: request, return_to_pool } = request;
    if !matches!(request.operation, BulkOperation::Delete) {
        let outcome = records::run_bulk(&*state.sales, &principal, &GATES, request).await?;
        return Ok(Json(outcome));
    }

    authorize(&principal, Action::DeleteSales)?;
    if !request.confirm {
        return Err(CoreError::validation(format!(
            "bulk DELETE on {} {} requires confirmation",
            request.ids.len(),
            Sale::KIND
        ))
        .into());
    }

    let outcome = state.ledger.delete_sales(&request.ids, return_to_pool).await?;
    records::bulk_completed(Sale::KIND, request.operation.label(), &outcome, &principal);
    Ok(Json(outcome))
}
