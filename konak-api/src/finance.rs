use axum::{extract::State, routing::get, Extension, Json, Router};
use konak_core::{authorize, Action, Principal};
use konak_ledger::FinanceSummary;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/finance/summary", get(finance_summary))
}

/// GET /v1/finance/summary
async fn finance_summary(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<FinanceSummary>, AppError> {
    authorize(&principal, Action::ViewFinance)?;
    let stays = state.accommodations.list().await?;
    let sales = state.sales.list().await?;
    Ok(Json(FinanceSummary::build(&stays, &sales)))
}
