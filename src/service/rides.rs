//! Ride lifecycle: booking, assignment, driver progress, sharing and cancellation.

use super::authorize;
use super::validation::{normalize_email, required_text};
use crate::error::AppError;
use crate::model::{Capability, NewRide, Ride, RideFilter, RideStatus, Role, User};
use crate::store::Store;

pub struct RideService;

impl RideService {
    pub async fn create(
        store: &dyn Store,
        actor: &User,
        origin: Option<&str>,
        destination: Option<&str>,
        shared_with_email: Option<&str>,
    ) -> Result<Ride, AppError> {
        authorize(actor, Capability::BookRide)?;
        let ride = NewRide {
            user_id: actor.id,
            origin: required_text(origin, "Missing required fields")?,
            destination: required_text(destination, "Missing required fields")?,
            shared_with_email: normalize_email(shared_with_email),
        };
        let ride = store.insert_ride(ride).await?;
        tracing::info!(ride_id = ride.id, user_id = actor.id, "ride requested");
        Ok(ride)
    }

    /// Visible to the owner, the assigned driver, the address it was shared with, and admins.
    pub async fn get(store: &dyn Store, actor: &User, id: i64) -> Result<Ride, AppError> {
        authorize(actor, Capability::ViewOwnRides)?;
        let ride = Self::load(store, id).await?;
        let visible = actor.is_admin()
            || ride.user_id == actor.id
            || ride.driver_id == Some(actor.id)
            || ride.shared_with_email.as_deref() == Some(actor.email.as_str());
        if !visible {
            return Err(AppError::Forbidden("You cannot view this ride".into()));
        }
        Ok(ride)
    }

    pub async fn list_all(store: &dyn Store, actor: &User) -> Result<Vec<Ride>, AppError> {
        authorize(actor, Capability::ListAllRides)?;
        store.list_rides(RideFilter::All).await
    }

    pub async fn list_owned(store: &dyn Store, actor: &User) -> Result<Vec<Ride>, AppError> {
        authorize(actor, Capability::ViewOwnRides)?;
        store.list_rides(RideFilter::OwnedBy(actor.id)).await
    }

    pub async fn list_assigned(store: &dyn Store, actor: &User) -> Result<Vec<Ride>, AppError> {
        authorize(actor, Capability::ViewAssignedRides)?;
        store.list_rides(RideFilter::DrivenBy(actor.id)).await
    }

    /// Assigns (or reassigns) a driver. Allowed from any non-terminal state.
    pub async fn assign(store: &dyn Store, actor: &User, id: i64, driver_email: Option<&str>) -> Result<Ride, AppError> {
        authorize(actor, Capability::AssignDriver)?;
        let email = normalize_email(driver_email).ok_or_else(|| AppError::BadRequest("Missing driverEmail".into()))?;
        let driver = store
            .user_by_email(&email)
            .await?
            .filter(|u| u.role == Role::Driver)
            .ok_or_else(|| AppError::NotFound("Driver not found".into()))?;
        let ride = Self::load(store, id).await?;
        if ride.status.is_terminal() {
            return Err(already_final(ride.status));
        }
        let ride = store
            .assign_ride(id, ride.version(), driver.id)
            .await?
            .ok_or_else(changed_concurrently)?;
        tracing::info!(ride_id = id, driver_id = driver.id, "driver assigned");
        Ok(ride)
    }

    pub async fn accept(store: &dyn Store, actor: &User, id: i64) -> Result<Ride, AppError> {
        authorize(actor, Capability::DriveRide)?;
        Self::transition(store, actor, id, RideStatus::Accepted).await
    }

    /// Driver status endpoint; `pending` and `assigned` are not valid targets here.
    pub async fn advance(store: &dyn Store, actor: &User, id: i64, status: Option<&str>) -> Result<Ride, AppError> {
        authorize(actor, Capability::DriveRide)?;
        let next: RideStatus = status
            .ok_or_else(|| AppError::BadRequest("Invalid status".into()))?
            .parse()?;
        if !next.is_driver_target() {
            return Err(AppError::BadRequest("Invalid status".into()));
        }
        Self::transition(store, actor, id, next).await
    }

    pub async fn complete(store: &dyn Store, actor: &User, id: i64) -> Result<Ride, AppError> {
        authorize(actor, Capability::DriveRide)?;
        Self::transition(store, actor, id, RideStatus::Completed).await
    }

    pub async fn cancel(store: &dyn Store, actor: &User, id: i64) -> Result<Ride, AppError> {
        authorize(actor, Capability::CancelRide)?;
        Self::transition(store, actor, id, RideStatus::Cancelled).await
    }

    pub async fn share(store: &dyn Store, actor: &User, id: i64, friend_email: Option<&str>) -> Result<Ride, AppError> {
        authorize(actor, Capability::ShareRide)?;
        let email = normalize_email(friend_email).ok_or_else(|| AppError::BadRequest("Missing friendEmail".into()))?;
        let ride = Self::load(store, id).await?;
        if ride.user_id != actor.id && !actor.is_admin() {
            return Err(AppError::Forbidden("You cannot share a ride you do not own".into()));
        }
        store.share_ride(id, &email).await?.ok_or_else(ride_not_found)
    }

    async fn load(store: &dyn Store, id: i64) -> Result<Ride, AppError> {
        store.ride(id).await?.ok_or_else(ride_not_found)
    }

    async fn transition(store: &dyn Store, actor: &User, id: i64, next: RideStatus) -> Result<Ride, AppError> {
        let ride = Self::load(store, id).await?;
        permit(actor, &ride, next)?;
        let updated = store
            .update_ride_status(id, ride.version(), next)
            .await?
            .ok_or_else(changed_concurrently)?;
        tracing::info!(ride_id = id, from = %ride.status, to = %next, actor_id = actor.id, "ride status changed");
        Ok(updated)
    }
}

/// Who may move `ride` to `next`.
///
/// The assigned driver follows the transition table while they still hold the driver role.
/// The owner may only cancel. Admins may move a non-terminal ride to any other state, but
/// driver states need a driver on the ride. Terminal rides never move.
pub fn permit(actor: &User, ride: &Ride, next: RideStatus) -> Result<(), AppError> {
    let is_admin = actor.is_admin();
    let is_driver = actor.role == Role::Driver && ride.driver_id == Some(actor.id);
    let owner_cancel = ride.user_id == actor.id && next == RideStatus::Cancelled;
    if !(is_admin || is_driver || owner_cancel) {
        return Err(AppError::Forbidden("Not assigned to you".into()));
    }
    if ride.status.is_terminal() {
        return Err(already_final(ride.status));
    }
    if ride.status == next {
        return Err(AppError::BadRequest(format!("Ride is already {}", next)));
    }
    if next.needs_driver() && ride.driver_id.is_none() {
        return Err(AppError::BadRequest("Ride has no driver assigned".into()));
    }
    if is_admin || ride.status.can_advance_to(next) {
        return Ok(());
    }
    Err(AppError::BadRequest(format!(
        "Cannot move ride from {} to {}",
        ride.status, next
    )))
}

fn already_final(status: RideStatus) -> AppError {
    AppError::BadRequest(format!("Ride is already {}", status))
}

fn ride_not_found() -> AppError {
    AppError::NotFound("Ride not found".into())
}

fn changed_concurrently() -> AppError {
    AppError::Conflict("Ride was modified concurrently, reload and retry".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use RideStatus::*;

    fn user(id: i64, role: Role) -> User {
        User {
            id,
            name: None,
            email: format!("u{}@example.com", id),
            role,
        }
    }

    fn ride(status: RideStatus) -> Ride {
        Ride {
            id: 1,
            user_id: 10,
            driver_id: Some(20),
            origin: "SmokeVille".into(),
            destination: "TestTown".into(),
            status,
            requested_at: Utc::now(),
            shared_with_email: None,
        }
    }

    #[test]
    fn driver_follows_the_table() {
        let driver = user(20, Role::Driver);
        assert!(permit(&driver, &ride(Assigned), Accepted).is_ok());
        assert!(permit(&driver, &ride(Accepted), Enroute).is_ok());
        let skipped = permit(&driver, &ride(Assigned), Completed).unwrap_err();
        assert_eq!(skipped.to_string(), "Cannot move ride from assigned to completed");
    }

    #[test]
    fn other_drivers_are_forbidden() {
        let stranger = user(21, Role::Driver);
        let err = permit(&stranger, &ride(Assigned), Accepted).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn terminal_rides_never_move() {
        let admin = user(1, Role::Admin);
        let driver = user(20, Role::Driver);
        for status in [Completed, Cancelled] {
            for next in [Pending, Assigned, Accepted, Enroute, Arrived, Completed, Cancelled] {
                assert!(matches!(permit(&admin, &ride(status), next), Err(AppError::BadRequest(_))));
                assert!(matches!(permit(&driver, &ride(status), next), Err(AppError::BadRequest(_))));
            }
        }
    }

    #[test]
    fn admin_may_skip_steps() {
        let admin = user(1, Role::Admin);
        assert!(permit(&admin, &ride(Pending), Completed).is_ok());
        assert!(permit(&admin, &ride(Arrived), Accepted).is_ok());
    }

    #[test]
    fn admin_cannot_drive_a_ride_without_a_driver() {
        let admin = user(1, Role::Admin);
        let unassigned = Ride {
            driver_id: None,
            ..ride(Pending)
        };
        for next in [Accepted, Enroute, Arrived, Completed] {
            let err = permit(&admin, &unassigned, next).unwrap_err();
            assert_eq!(err.to_string(), "Ride has no driver assigned");
        }
        assert!(permit(&admin, &unassigned, Cancelled).is_ok());
    }

    #[test]
    fn revoked_driver_loses_the_ride() {
        let revoked = user(20, Role::User);
        for (status, next) in [(Assigned, Accepted), (Enroute, Arrived), (Accepted, Cancelled)] {
            let err = permit(&revoked, &ride(status), next).unwrap_err();
            assert!(matches!(err, AppError::Forbidden(_)));
        }
    }

    #[test]
    fn owner_may_only_cancel() {
        let owner = user(10, Role::User);
        assert!(permit(&owner, &ride(Enroute), Cancelled).is_ok());
        assert!(matches!(permit(&owner, &ride(Enroute), Arrived), Err(AppError::Forbidden(_))));
    }
}
