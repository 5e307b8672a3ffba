use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use crate::{
    error::{ApiJson, AppError},
    state::AppState,
    users::{
        dto::{LoginRequest, LoginResponse},
        services,
    },
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = services::authenticate(state.users.as_ref(), &state.hasher, payload).await?;
    let token = state.sessions.issue(&user.email)?;
    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}
