use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{password::hash_password, CurrentUser},
    error::{is_unique_violation, ApiError},
    state::AppState,
    users::{
        dto::{CreateUserRequest, TokenRequest, TokenResponse, UpdateMeRequest, UserResponse},
        repo::User,
        service,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/token", post(obtain_token))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(get_me).put(update_me).patch(update_me))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = service::create_user(
        &state.db,
        &payload.email,
        &payload.password,
        &payload.name,
        false,
        false,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn obtain_token(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = service::authenticate(&state.db, &payload.email, &payload.password).await?;
    let token = state.tokens.issue(user.id).await?;
    info!(user_id = %user.id, "token issued");
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(user))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(user.into()))
}

#[instrument(skip(state, user, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateMeRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let email = match payload.email.as_deref() {
        Some(raw) => {
            let email = service::normalize_email(raw);
            service::validate_email(&email)?;
            Some(email)
        }
        None => None,
    };

    let password_hash = match payload.password.as_deref() {
        Some(plain) => {
            service::validate_password(plain)?;
            Some(hash_password(plain)?)
        }
        None => None,
    };

    let updated = User::update_profile(
        &state.db,
        user.id,
        email.as_deref(),
        payload.name.as_deref(),
        password_hash.as_deref(),
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::EmailTaken
        } else {
            ApiError::Internal(e)
        }
    })?;

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(updated.into()))
}
