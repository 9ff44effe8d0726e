use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest, LoginResponse,
            MessageResponse, RegisterRequest, ResetPasswordRequest, UpdateProfileRequest,
        },
        extractors::AuthUser,
        repo_types::User,
        services::{AuthService, RESET_DONE_MESSAGE},
    },
    error::AppResult,
    extract::StrictJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/password/forgot", post(forgot_password))
        .route("/users/password/reset", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(get_me).put(update_me))
}

fn service(state: &AppState) -> AuthService<'_> {
    AuthService::new(state.users.as_ref(), &state.config.auth)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    StrictJson(payload): StrictJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = service(&state).register(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    StrictJson(payload): StrictJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    service(&state).login(payload).await.map(Json)
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    StrictJson(payload): StrictJson<ForgotPasswordRequest>,
) -> AppResult<Json<ForgotPasswordResponse>> {
    service(&state).forgot_password(payload).await.map(Json)
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    StrictJson(payload): StrictJson<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    service(&state).reset_password(payload).await?;
    Ok(Json(MessageResponse {
        message: RESET_DONE_MESSAGE,
    }))
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

#[instrument(skip_all)]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    StrictJson(payload): StrictJson<UpdateProfileRequest>,
) -> AppResult<Json<User>> {
    service(&state)
        .update_profile(user.id, payload)
        .await
        .map(Json)
}
