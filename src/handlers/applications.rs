use crate::error::AppError;
use crate::extractors::{Actor, JsonBody};
use crate::response::{created, ok, ApplicationBody, Applications};
use crate::service::ApplicationService;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub license_number: Option<String>,
    pub vehicle: Option<String>,
    pub notes: Option<String>,
}

pub async fn apply(
    State(state): State<AppState>,
    Actor(actor): Actor,
    JsonBody(body): JsonBody<ApplyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let application = ApplicationService::apply(
        state.store.as_ref(),
        &actor,
        body.license_number.as_deref(),
        body.vehicle.as_deref(),
        body.notes.as_deref(),
    )
    .await?;
    Ok(created(ApplicationBody { application }))
}

pub async fn mine(State(state): State<AppState>, Actor(actor): Actor) -> Result<impl IntoResponse, AppError> {
    let applications = ApplicationService::mine(state.store.as_ref(), &actor).await?;
    Ok(ok(Applications { applications }))
}
