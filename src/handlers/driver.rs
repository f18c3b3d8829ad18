//! Driver progress on assigned rides. Both endpoints answer with the bare ride.

use crate::error::AppError;
use crate::extractors::{Actor, JsonBody, PathParam};
use crate::response::ok;
use crate::service::RideService;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
}

pub async fn accept(
    State(state): State<AppState>,
    Actor(actor): Actor,
    PathParam(id): PathParam<i64>,
) -> Result<impl IntoResponse, AppError> {
    let ride = RideService::accept(state.store.as_ref(), &actor, id).await?;
    Ok(ok(ride))
}

pub async fn update_status(
    State(state): State<AppState>,
    Actor(actor): Actor,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<StatusUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let ride = RideService::advance(state.store.as_ref(), &actor, id, body.status.as_deref()).await?;
    Ok(ok(ride))
}
