use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};

use crate::{error::AppError, state::AppState};

/// Resolves inbound requests to an authenticated email and issues new sessions.
pub trait SessionVerifier: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<String>;
    fn issue(&self, email: &str) -> anyhow::Result<String>;
}

/// Email of the caller, taken from a verified session.
#[derive(Debug, Clone)]
pub struct Session(pub String);

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state
            .sessions
            .resolve(&parts.headers)
            .map(Session)
            .ok_or(AppError::Unauthorized("Unauthorized"))
    }
}
