use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use konak_core::{Principal, User};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::{AppState, AuthConfig};

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub exp: usize,
}

impl SessionClaims {
    pub fn for_user(user: &User, auth: &AuthConfig) -> Self {
        Self {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            permissions: user.permissions.iter().map(|p| p.key().to_string()).collect(),
            exp: expires_at(auth.expiration),
        }
    }
}

fn expires_at(seconds: u64) -> usize {
    let exp = chrono::Utc::now() + chrono::Duration::seconds(seconds.min(i64::MAX as u64) as i64);
    exp.timestamp().max(0) as usize
}

/// Signs a session token. The login flow itself lives in the external auth service.
pub fn issue_token(auth: &AuthConfig, claims: &SessionClaims) -> Result<String, AppError> {
    encode(&Header::default(), claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
        .map_err(|e| AppError::Internal(e.into()))
}

// ============================================================================
// Session Middleware
// ============================================================================

/// Resolves the bearer token into a [`Principal`] in the request extensions.
/// Unknown role labels pass through as a role-less principal, which every gate denies.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::Authentication("Missing bearer token".to_string()))?;

    let token_data = decode::<SessionClaims>(
        bearer.token(),
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::Authentication(format!("Invalid session: {}", e)))?;

    let claims = token_data.claims;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Authentication("Invalid session subject".to_string()))?;

    let principal = Principal::from_claims(user_id, Some(claims.email), &claims.role, &claims.permissions);
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
