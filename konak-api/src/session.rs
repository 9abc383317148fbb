use axum::{routing::get, Extension, Json, Router};
use konak_core::{can_perform, Action, Principal};
use serde::Serialize;

use crate::state::AppState;

const ALL_ACTIONS: [Action; 15] = [
    Action::ViewHotels,
    Action::EditHotels,
    Action::DeleteHotels,
    Action::ViewTransfers,
    Action::DispatchTransfers,
    Action::DeleteTransfers,
    Action::ViewAccommodation,
    Action::EditAccommodation,
    Action::DeleteAccommodation,
    Action::TransferToSales,
    Action::ViewSales,
    Action::EditSales,
    Action::DeleteSales,
    Action::ViewFinance,
    Action::ManageUsers,
];

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub principal: Principal,
    /// What the dashboard should enable for this caller.
    pub allowed_actions: Vec<Action>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/session", get(current_session))
}

/// GET /v1/session
async fn current_session(Extension(principal): Extension<Principal>) -> Json<SessionResponse> {
    let allowed_actions = ALL_ACTIONS
        .into_iter()
        .filter(|a| can_perform(Some(&principal), *a))
        .collect();
    Json(SessionResponse { principal, allowed_actions })
}
