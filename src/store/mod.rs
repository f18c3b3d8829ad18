//! Persistence port. `PgStore` talks to PostgreSQL; `MemoryStore` keeps everything in
//! process for tests and `STORAGE=memory` demos.
//!
//! Guarded multi-step writes (last-admin demotion, application review, ride status
//! changes) are atomic inside each implementation; the rules themselves live in
//! [`crate::model`].

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

use crate::error::AppError;
use crate::model::{
    ApplicationStatus, DriverApplication, NewApplication, NewRide, Review, Ride, RideFilter, RideStatus, RideVersion, Role, User,
};
use async_trait::async_trait;
use serde::Deserialize;

/// How an upsert treats the name of an existing user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameMerge {
    /// Signup: a non-empty incoming name replaces the stored one.
    PreferIncoming,
    /// Login: the stored name wins; the incoming one only fills a missing name.
    KeepExisting,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetScope {
    Rides,
    Applications,
    All,
}

impl ResetScope {
    pub fn includes_rides(self) -> bool {
        matches!(self, ResetScope::Rides | ResetScope::All)
    }

    pub fn includes_applications(self) -> bool {
        matches!(self, ResetScope::Applications | ResetScope::All)
    }
}

impl std::str::FromStr for ResetScope {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rides" => Ok(ResetScope::Rides),
            "applications" => Ok(ResetScope::Applications),
            "all" => Ok(ResetScope::All),
            _ => Err(AppError::BadRequest("scope must be one of: rides, applications, all".into())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResetCounts {
    pub rides: u64,
    pub applications: u64,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap liveness probe for readiness checks.
    async fn ping(&self) -> Result<(), AppError>;

    async fn upsert_user(&self, email: &str, name: &str, merge: NameMerge) -> Result<User, AppError>;
    async fn user_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    /// Changes a role; refuses to demote the last admin. `None` when the user does not exist.
    async fn set_role(&self, id: i64, role: Role) -> Result<Option<User>, AppError>;
    /// Creates the user as driver, or makes an existing user a driver.
    async fn upsert_driver(&self, email: &str, name: &str) -> Result<User, AppError>;
    /// Inserts an admin unless the email already exists. Returns whether a row was created.
    async fn seed_admin(&self, email: &str, name: &str) -> Result<bool, AppError>;

    async fn insert_ride(&self, ride: NewRide) -> Result<Ride, AppError>;
    async fn ride(&self, id: i64) -> Result<Option<Ride>, AppError>;
    async fn list_rides(&self, filter: RideFilter) -> Result<Vec<Ride>, AppError>;
    /// Sets driver and `assigned` status if the ride still matches `expected`.
    async fn assign_ride(&self, id: i64, expected: RideVersion, driver_id: i64) -> Result<Option<Ride>, AppError>;
    /// Compare-and-set on status and driver. `None` when the ride is gone or either moved on.
    async fn update_ride_status(&self, id: i64, expected: RideVersion, next: RideStatus) -> Result<Option<Ride>, AppError>;
    async fn share_ride(&self, id: i64, email: &str) -> Result<Option<Ride>, AppError>;

    /// Fails with `Conflict` when the user already has an `applied` application.
    async fn insert_application(&self, application: NewApplication) -> Result<DriverApplication, AppError>;
    async fn applications_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<DriverApplication>, AppError>;
    async fn list_applications(&self, status: Option<ApplicationStatus>) -> Result<Vec<DriverApplication>, AppError>;
    /// Resolves a pending application; approval promotes a plain user to driver.
    async fn review_application(&self, id: i64, review: Review) -> Result<Option<DriverApplication>, AppError>;

    async fn reset(&self, scope: ResetScope) -> Result<ResetCounts, AppError>;
}

pub(crate) fn pending_conflict() -> AppError {
    AppError::Conflict("You already have a pending application".into())
}
