//! Bulk maintenance for demos.

use super::authorize;
use crate::error::AppError;
use crate::model::{Capability, User};
use crate::store::{ResetCounts, ResetScope, Store};

pub struct AdminService;

impl AdminService {
    /// Deletes rides and/or driver applications. Users are never touched.
    pub async fn reset(store: &dyn Store, actor: &User, scope: Option<&str>) -> Result<ResetCounts, AppError> {
        authorize(actor, Capability::Administer)?;
        let scope: ResetScope = scope
            .ok_or_else(|| AppError::BadRequest("scope must be one of: rides, applications, all".into()))?
            .parse()?;
        let counts = store.reset(scope).await?;
        tracing::warn!(
            admin_id = actor.id,
            rides = counts.rides,
            applications = counts.applications,
            "data reset"
        );
        Ok(counts)
    }
}
