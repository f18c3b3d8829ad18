//! Ride booking, listing and owner/admin actions.

use crate::error::AppError;
use crate::extractors::{Actor, JsonBody, PathParam};
use crate::response::{created, ok, RideUpdate, Rides};
use crate::service::RideService;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRide {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub shared_with_email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRide {
    pub driver_email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRide {
    pub friend_email: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Actor(actor): Actor,
    JsonBody(body): JsonBody<CreateRide>,
) -> Result<impl IntoResponse, AppError> {
    let ride = RideService::create(
        state.store.as_ref(),
        &actor,
        body.origin.as_deref(),
        body.destination.as_deref(),
        body.shared_with_email.as_deref(),
    )
    .await?;
    Ok(created(ride))
}

pub async fn list_all(State(state): State<AppState>, Actor(actor): Actor) -> Result<impl IntoResponse, AppError> {
    let rides = RideService::list_all(state.store.as_ref(), &actor).await?;
    Ok(ok(Rides { rides }))
}

pub async fn list_mine(State(state): State<AppState>, Actor(actor): Actor) -> Result<impl IntoResponse, AppError> {
    let rides = RideService::list_owned(state.store.as_ref(), &actor).await?;
    Ok(ok(Rides { rides }))
}

pub async fn list_assigned(State(state): State<AppState>, Actor(actor): Actor) -> Result<impl IntoResponse, AppError> {
    let rides = RideService::list_assigned(state.store.as_ref(), &actor).await?;
    Ok(ok(Rides { rides }))
}

pub async fn read(
    State(state): State<AppState>,
    Actor(actor): Actor,
    PathParam(id): PathParam<i64>,
) -> Result<impl IntoResponse, AppError> {
    let ride = RideService::get(state.store.as_ref(), &actor, id).await?;
    Ok(ok(ride))
}

pub async fn assign(
    State(state): State<AppState>,
    Actor(actor): Actor,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<AssignRide>,
) -> Result<impl IntoResponse, AppError> {
    let ride = RideService::assign(state.store.as_ref(), &actor, id, body.driver_email.as_deref()).await?;
    Ok(ok(RideUpdate {
        message: "Driver assigned",
        ride,
    }))
}

pub async fn share(
    State(state): State<AppState>,
    Actor(actor): Actor,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<ShareRide>,
) -> Result<impl IntoResponse, AppError> {
    let ride = RideService::share(state.store.as_ref(), &actor, id, body.friend_email.as_deref()).await?;
    Ok(ok(RideUpdate {
        message: "Ride shared successfully",
        ride,
    }))
}

pub async fn complete(
    State(state): State<AppState>,
    Actor(actor): Actor,
    PathParam(id): PathParam<i64>,
) -> Result<impl IntoResponse, AppError> {
    let ride = RideService::complete(state.store.as_ref(), &actor, id).await?;
    Ok(ok(RideUpdate {
        message: "Ride marked completed",
        ride,
    }))
}

pub async fn cancel(
    State(state): State<AppState>,
    Actor(actor): Actor,
    PathParam(id): PathParam<i64>,
) -> Result<impl IntoResponse, AppError> {
    let ride = RideService::cancel(state.store.as_ref(), &actor, id).await?;
    Ok(ok(RideUpdate {
        message: "Ride cancelled",
        ride,
    }))
}
