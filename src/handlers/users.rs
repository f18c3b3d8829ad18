//! Signup, login and the caller's own account.

use crate::error::AppError;
use crate::extractors::{Actor, JsonBody};
use crate::response::{created, ok, Session, UserBody};
use crate::service::UserService;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;

/// Unknown fields, `role` included, are ignored.
#[derive(Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
}

pub async fn signup(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user, token) =
        UserService::signup(state.store.as_ref(), &state.tokens, body.email.as_deref(), body.name.as_deref()).await?;
    Ok(created(Session { user, token }))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user, token) = UserService::login(state.store.as_ref(), &state.tokens, body.email.as_deref()).await?;
    Ok(ok(Session { user, token }))
}

pub async fn me(State(state): State<AppState>, Actor(actor): Actor) -> Result<impl IntoResponse, AppError> {
    let user = UserService::me(state.store.as_ref(), &actor).await?;
    Ok(ok(UserBody { user }))
}
