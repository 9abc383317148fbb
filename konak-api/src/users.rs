use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use konak_core::users::USER_SEARCH_FIELDS;
use konak_core::{authorize, Action, CoreError, Page, Principal, User, UserDraft};
use konak_shared::events::ChangeKind;
use uuid::Uuid;

use crate::error::AppError;
use crate::listing::{Columns, ListParams};
use crate::records::{self, ConfirmQuery, VersionQuery};
use crate::state::AppState;

const COLUMNS: Columns = Columns {
    search: USER_SEARCH_FIELDS,
    equals: &["role"],
    ranges: &[],
    sortable: &["email", "name", "role", "created_at"],
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).put(update_user).delete(delete_user))
}

async fn ensure_email_free(state: &AppState, email: &str, except: Option<Uuid>) -> Result<(), AppError> {
    let taken = state
        .users
        .list()
        .await?
        .iter()
        .any(|u| u.email.eq_ignore_ascii_case(email.trim()) && Some(u.id) != except);
    if taken {
        return Err(CoreError::conflict(format!("a user with email {} already exists", email.trim())).into());
    }
    Ok(())
}

/// GET /v1/users
async fn list_users(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<Page<User>>, AppError> {
    authorize(&principal, Action::ManageUsers)?;
    let params = ListParams::parse(&raw, &COLUMNS, &state.listing, &[])?;
    Ok(Json(params.page_of(state.users.list().await?)))
}

/// POST /v1/users
async fn create_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(draft): Json<UserDraft>,
) -> Result<(StatusCode, Json<User>), AppError> {
    authorize(&principal, Action::ManageUsers)?;
    let user = User::from_draft(draft)?;
    ensure_email_free(&state, &user.email, None).await?;
    let user = state.users.create(user).await?;
    tracing::info!(user_id = %user.id, role = %user.role, "user created");
    records::record_changed(&user, ChangeKind::Created, &principal);
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /v1/users/{id}
async fn get_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    authorize(&principal, Action::ManageUsers)?;
    Ok(Json(records::load(&*state.users, id).await?))
}

/// PUT /v1/users/{id}
async fn update_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Query(version): Query<VersionQuery>,
    Json(draft): Json<UserDraft>,
) -> Result<Json<User>, AppError> {
    authorize(&principal, Action::ManageUsers)?;
    let mut user = records::load(&*state.users, id).await?;
    user.apply(draft)?;
    ensure_email_free(&state, &user.email, Some(id)).await?;
    let user = state.users.update(user, version.expected_version).await?;
    records::record_changed(&user, ChangeKind::Updated, &principal);
    Ok(Json(user))
}

/// DELETE /v1/users/{id}
///
/// Deleting your own account ends your access, so it needs `?confirm=true`.
async fn delete_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Query(confirm): Query<ConfirmQuery>,
) -> Result<StatusCode, AppError> {
    authorize(&principal, Action::ManageUsers)?;
    if id == principal.user_id {
        if !confirm.confirm {
            return Err(CoreError::validation("deleting your own account requires confirm=true").into());
        }
        tracing::warn!(user_id = %id, "user is deleting their own account");
    }
    state.users.delete(id).await?;
    records::record_deleted::<User>(id, &principal);
    Ok(StatusCode::NO_CONTENT)
}
