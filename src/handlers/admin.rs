//! Admin console: users, driver roles, application review, data reset.

use crate::error::AppError;
use crate::extractors::{Actor, JsonBody, PathParam, QueryParams};
use crate::model::ReviewDecision;
use crate::response::{ok, ApplicationUpdate, Applications, ResetSummary, RoleUpdate, UserUpdate, Users};
use crate::service::{AdminService, ApplicationService, UserService};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct RoleRequest {
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct EmailRequest {
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct DecisionRequest {
    pub action: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub review_notes: Option<String>,
}

#[derive(Deserialize)]
pub struct ResetRequest {
    pub scope: Option<String>,
}

pub async fn list_users(State(state): State<AppState>, Actor(actor): Actor) -> Result<impl IntoResponse, AppError> {
    let users = UserService::list(state.store.as_ref(), &actor).await?;
    Ok(ok(Users { users }))
}

pub async fn change_role(
    State(state): State<AppState>,
    Actor(actor): Actor,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<RoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = UserService::change_role(state.store.as_ref(), &actor, id, body.role.as_deref()).await?;
    Ok(ok(RoleUpdate {
        message: "Role updated",
        id: user.id,
        role: user.role,
    }))
}

pub async fn approve_driver(
    State(state): State<AppState>,
    Actor(actor): Actor,
    JsonBody(body): JsonBody<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = UserService::approve_driver(state.store.as_ref(), &actor, body.email.as_deref()).await?;
    Ok(ok(UserUpdate {
        message: "Driver approved",
        user,
    }))
}

pub async fn revoke_driver(
    State(state): State<AppState>,
    Actor(actor): Actor,
    JsonBody(body): JsonBody<EmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = UserService::revoke_driver(state.store.as_ref(), &actor, body.email.as_deref()).await?;
    Ok(ok(UserUpdate {
        message: "Driver revoked",
        user,
    }))
}

pub async fn list_applications(
    State(state): State<AppState>,
    Actor(actor): Actor,
    QueryParams(query): QueryParams<StatusQuery>,
) -> Result<impl IntoResponse, AppError> {
    let applications = ApplicationService::list(state.store.as_ref(), &actor, query.status.as_deref()).await?;
    Ok(ok(Applications { applications }))
}

/// `PATCH /driver-apps/:id/decision` with `{action, notes?}`.
pub async fn decide_application(
    State(state): State<AppState>,
    Actor(actor): Actor,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<DecisionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let decision: ReviewDecision = body
        .action
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("action must be 'approve' or 'reject'".into()))?
        .parse()?;
    let application =
        ApplicationService::review(state.store.as_ref(), &actor, id, decision, body.notes.as_deref()).await?;
    let message = match decision {
        ReviewDecision::Approve => "Approved",
        ReviewDecision::Reject => "Rejected",
    };
    Ok(ok(ApplicationUpdate { message, application }))
}

/// The `/driver-applications/:id/approve|reject` pair; the body is optional.
pub async fn approve_application(
    state: State<AppState>,
    actor: Actor,
    id: PathParam<i64>,
    body: Option<JsonBody<ReviewRequest>>,
) -> Result<impl IntoResponse, AppError> {
    review(state, actor, id, body, ReviewDecision::Approve, "Application approved")
        .await
        .map(ok)
}

pub async fn reject_application(
    state: State<AppState>,
    actor: Actor,
    id: PathParam<i64>,
    body: Option<JsonBody<ReviewRequest>>,
) -> Result<impl IntoResponse, AppError> {
    review(state, actor, id, body, ReviewDecision::Reject, "Application rejected")
        .await
        .map(ok)
}

async fn review(
    State(state): State<AppState>,
    Actor(actor): Actor,
    PathParam(id): PathParam<i64>,
    body: Option<JsonBody<ReviewRequest>>,
    decision: ReviewDecision,
    message: &'static str,
) -> Result<ApplicationUpdate, AppError> {
    let notes = body.and_then(|JsonBody(b)| b.review_notes);
    let application = ApplicationService::review(state.store.as_ref(), &actor, id, decision, notes.as_deref()).await?;
    Ok(ApplicationUpdate { message, application })
}

pub async fn reset(
    State(state): State<AppState>,
    Actor(actor): Actor,
    JsonBody(body): JsonBody<ResetRequest>,
) -> Result<impl IntoResponse, AppError> {
    let counts = AdminService::reset(state.store.as_ref(), &actor, body.scope.as_deref()).await?;
    Ok(ok(ResetSummary {
        message: "Reset complete",
        rides: counts.rides,
        applications: counts.applications,
    }))
}
