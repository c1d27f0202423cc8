//! User account handlers.
//!
//! Profile upsert doubles as token issuance: every successful write
//! returns a fresh credential so clients re-key on each profile update.

use axum::{
    extract::{Extension, Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::{error::ApiError, routes::AppState};
use crate::auth::{
    identity::Identity,
    models::{UserRecord, UserRole},
};

#[derive(Debug, Serialize)]
pub struct UpsertUserResponse {
    pub token: String,
    pub expires_in: usize, // seconds until expiration
    pub user: UserRecord,
}

/// Upsert a user profile and issue a fresh token. Public: this is how an
/// account comes into existence on first login.
pub async fn upsert_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Json(profile): Json<Map<String, Value>>,
) -> Result<Json<UpsertUserResponse>, ApiError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("invalid email".to_string()));
    }

    let user = state.users.upsert_user(&email, &profile)?;
    let (token, expires_in) = state.jwt.issue_token(&email, &profile)?;

    Ok(Json(UpsertUserResponse {
        token,
        expires_in,
        user,
    }))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub email: String,
    /// Resolved role; absent when no user record exists yet.
    pub role: Option<UserRole>,
}

/// Current identity and resolved role.
pub async fn current_user(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<MeResponse>, ApiError> {
    let role = state.users.resolve_role(identity.as_str())?;

    Ok(Json(MeResponse {
        email: identity.into_inner(),
        role,
    }))
}

#[derive(Debug, Serialize)]
pub struct AdminStatusResponse {
    pub admin: bool,
}

/// Whether the caller is an admin. The path email is a caller-claimed
/// identity and must match the token identity.
pub async fn admin_status(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(email): Path<String>,
) -> Result<Json<AdminStatusResponse>, ApiError> {
    identity.ensure_matches(&email)?;

    let role = state.users.resolve_role(identity.as_str())?;

    Ok(Json(AdminStatusResponse {
        admin: role == Some(UserRole::Admin),
    }))
}

/// List all user records. Admin only.
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserRecord>>, ApiError> {
    Ok(Json(state.users.list_users()?))
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdate {
    pub role: UserRole,
}

/// Grant or revoke the admin role. Admin only.
pub async fn set_role(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Json(payload): Json<RoleUpdate>,
) -> Result<Json<UserRecord>, ApiError> {
    if !state.users.set_role(&email, payload.role)? {
        return Err(ApiError::NotFound(format!("No account for {}", email)));
    }

    let user = state
        .users
        .get_user(&email)?
        .ok_or_else(|| ApiError::NotFound(format!("No account for {}", email)))?;

    Ok(Json(user))
}
