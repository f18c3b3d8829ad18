//! Driver applications: submit, inspect, review.

use super::authorize;
use super::validation::non_empty;
use crate::error::AppError;
use crate::model::{ApplicationStatus, Capability, DriverApplication, NewApplication, Review, ReviewDecision, User};
use crate::store::Store;

/// How many applications `mine` returns.
pub const RECENT_APPLICATIONS: i64 = 5;

pub struct ApplicationService;

impl ApplicationService {
    pub async fn apply(
        store: &dyn Store,
        actor: &User,
        license_number: Option<&str>,
        vehicle: Option<&str>,
        notes: Option<&str>,
    ) -> Result<DriverApplication, AppError> {
        authorize(actor, Capability::ApplyAsDriver)?;
        let application = store
            .insert_application(NewApplication {
                user_id: actor.id,
                license_number: non_empty(license_number),
                vehicle: non_empty(vehicle),
                notes: non_empty(notes),
            })
            .await?;
        tracing::info!(application_id = application.id, user_id = actor.id, "driver application submitted");
        Ok(application)
    }

    pub async fn mine(store: &dyn Store, actor: &User) -> Result<Vec<DriverApplication>, AppError> {
        authorize(actor, Capability::ApplyAsDriver)?;
        store.applications_for_user(actor.id, RECENT_APPLICATIONS).await
    }

    pub async fn list(store: &dyn Store, actor: &User, status: Option<&str>) -> Result<Vec<DriverApplication>, AppError> {
        authorize(actor, Capability::Administer)?;
        let status = match non_empty(status) {
            Some(raw) => Some(raw.parse::<ApplicationStatus>()?),
            None => None,
        };
        store.list_applications(status).await
    }

    pub async fn review(
        store: &dyn Store,
        actor: &User,
        id: i64,
        decision: ReviewDecision,
        notes: Option<&str>,
    ) -> Result<DriverApplication, AppError> {
        authorize(actor, Capability::Administer)?;
        let review = Review {
            reviewer_id: actor.id,
            decision,
            notes: non_empty(notes),
        };
        let application = store
            .review_application(id, review)
            .await?
            .ok_or_else(|| AppError::NotFound("Application not found".into()))?;
        tracing::info!(
            application_id = id,
            status = application.status.as_str(),
            admin_id = actor.id,
            "driver application reviewed"
        );
        Ok(application)
    }
}
