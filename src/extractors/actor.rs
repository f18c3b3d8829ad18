//! The authenticated caller, resolved through the configured identity providers.

use crate::error::AppError;
use crate::model::User;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Rejects with 401 when no provider recognises the request.
#[derive(Clone, Debug)]
pub struct Actor(pub User);

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        state
            .identity
            .identify(&parts.headers)
            .await?
            .map(Actor)
            .ok_or_else(AppError::unauthorized)
    }
}
