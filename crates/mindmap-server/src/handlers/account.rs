//! Registration, login and the current user

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use mindmap_payments::AccessStatus;
use mindmap_store::{NewUser, User};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthUser, generate_token, hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

use super::access_status;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: User,
    pub access: AccessStatus,
}

fn validate(request: &RegisterRequest) -> ApiResult<()> {
    let username = request.username.trim();
    if !(3..=32).contains(&username.chars().count())
        || !username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ApiError::Validation(
            "Username must be 3-32 letters, digits, '-' or '_'".into(),
        ));
    }
    let email = request.email.trim();
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(ApiError::Validation("Invalid email address".into()));
    }
    if request.password.chars().count() < 8 {
        return Err(ApiError::Validation("Password must be at least 8 characters".into()));
    }
    Ok(())
}

async fn start_session(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let now = Utc::now();
    let purged = state.db.purge_expired_sessions(now).await?;
    if purged > 0 {
        tracing::debug!(purged, "Expired sessions removed");
    }

    let token = generate_token();
    state.db.create_session(&user.id, &token, now).await?;
    Ok(AuthResponse { token, user })
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    validate(&request)?;
    let new_user = NewUser {
        username: request.username.trim().to_string(),
        email: request.email.trim().to_string(),
        password_hash: hash_password(&request.password)?,
    };

    let user = state.db.create_user(&new_user, Utc::now()).await.map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => ApiError::Conflict("Username is already taken".into()),
        other => other,
    })?;

    Ok((StatusCode::CREATED, Json(start_session(&state, user).await?)))
}

pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> ApiResult<Json<AuthResponse>> {
    let user = state
        .db
        .get_user_by_username(request.username.trim())
        .await?
        .filter(|user| verify_password(&request.password, &user.password_hash))
        .ok_or_else(|| {
            tracing::info!(username = %request.username, "Failed login");
            ApiError::Unauthenticated
        })?;

    Ok(Json(start_session(&state, user).await?))
}

pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> ApiResult<StatusCode> {
    state.db.delete_session(&auth.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<MeResponse>> {
    let access = access_status(&state, &auth.user).await?;
    Ok(Json(MeResponse { user: auth.user, access }))
}
