use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use super::{
    dto::{AuthResponse, LoginRequest, ProfileResponse, PublicUser, RegisterRequest},
    extractors::AuthUser,
    jwt::JwtKeys,
    services,
};
use crate::{
    error::{AppError, AppResult},
    response::{created, ok, Envelope},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/profile", get(profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(axum::http::StatusCode, Json<Envelope<AuthResponse>>)> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let (user, token) = services::register(state.users.as_ref(), &keys, payload).await?;

    Ok(created(
        Envelope::data(AuthResponse {
            user: PublicUser::from(&user),
            token,
        })
        .with_message("User registered successfully"),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<(axum::http::StatusCode, Json<Envelope<AuthResponse>>)> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let (user, token) = services::login(state.users.as_ref(), &keys, payload).await?;

    Ok(ok(Envelope::data(AuthResponse {
        user: PublicUser::from(&user),
        token,
    })
    .with_message("Login successful")))
}

#[instrument(skip(state, caller))]
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> AppResult<Json<Envelope<ProfileResponse>>> {
    let user = state.users.find_by_id(caller.id).await?.ok_or_else(|| {
        warn!(user_id = %caller.id, "profile user not found");
        AppError::NotFound("User not found".into())
    })?;

    Ok(Json(Envelope::data(ProfileResponse::from(user))))
}
