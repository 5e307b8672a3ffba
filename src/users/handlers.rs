use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{PublicUser, RegisterRequest, UpdateProfileRequest},
    services,
};
use crate::{
    auth::session::Session,
    error::{ApiJson, AppError},
    state::AppState,
};

/// Carries a replacement token after the session email changes.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/auth/profile", get(get_profile).put(update_profile))
}

pub fn register_routes() -> Router<AppState> {
    Router::new().route("/auth/register", post(register))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Session(email): Session,
) -> Result<Json<PublicUser>, AppError> {
    let user = services::load_profile(state.users.as_ref(), &email).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    Session(email): Session,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> Result<(HeaderMap, Json<PublicUser>), AppError> {
    let user =
        services::update_profile(state.users.as_ref(), &state.hasher, &email, payload).await?;

    let mut headers = HeaderMap::new();
    if user.email != email {
        let token = state.sessions.issue(&user.email)?;
        let value = HeaderValue::from_str(&token).map_err(anyhow::Error::new)?;
        headers.insert(SESSION_TOKEN_HEADER, value);
    }
    Ok((headers, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let user = services::register(state.users.as_ref(), &state.hasher, payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}
