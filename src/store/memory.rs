//! In-process store. A single `RwLock` serializes writers, which gives the same
//! guarantees the Postgres store gets from row locks.

use super::{pending_conflict, NameMerge, ResetCounts, ResetScope, Store};
use crate::error::AppError;
use crate::model::{
    ensure_admin_remains, ApplicationStatus, DriverApplication, NewApplication, NewRide, ReviewDecision, Review,
    Ride, RideFilter, RideStatus, RideVersion, Role, User,
};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    rides: Vec<Ride>,
    applications: Vec<DriverApplication>,
    next_user_id: i64,
    next_ride_id: i64,
    next_application_id: i64,
}

impl Tables {
    fn user_mut(&mut self, id: i64) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    fn ride_mut(&mut self, id: i64) -> Option<&mut Ride> {
        self.rides.iter_mut().find(|r| r.id == id)
    }

    fn insert_user(&mut self, email: &str, name: &str, role: Role) -> User {
        self.next_user_id += 1;
        let user = User {
            id: self.next_user_id,
            name: Some(name.to_string()).filter(|n| !n.is_empty()),
            email: email.to_string(),
            role,
        };
        self.users.push(user.clone());
        user
    }

    /// Applications carry the applicant's current email and name, as the SQL join does.
    fn joined(&self, application: &DriverApplication) -> DriverApplication {
        let mut out = application.clone();
        if let Some(user) = self.users.iter().find(|u| u.id == application.user_id) {
            out.email = user.email.clone();
            out.name = user.name.clone();
        }
        out
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, F>(rows: &mut [T], key: F)
where
    F: Fn(&T) -> (chrono::DateTime<Utc>, i64),
{
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn upsert_user(&self, email: &str, name: &str, merge: NameMerge) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.iter_mut().find(|u| u.email == email) {
            let stored = user.name.clone().filter(|n| !n.is_empty());
            let incoming = Some(name.to_string()).filter(|n| !n.is_empty());
            user.name = match merge {
                NameMerge::PreferIncoming => incoming.or(stored),
                NameMerge::KeepExisting => stored.or(incoming),
            };
            return Ok(user.clone());
        }
        Ok(tables.insert_user(email, name, Role::User))
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let tables = self.tables.read().await;
        let mut users = tables.users.clone();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn set_role(&self, id: i64, role: Role) -> Result<Option<User>, AppError> {
        let mut tables = self.tables.write().await;
        let admin_count = tables.users.iter().filter(|u| u.role == Role::Admin).count();
        let Some(user) = tables.user_mut(id) else {
            return Ok(None);
        };
        ensure_admin_remains(user.role, role, admin_count)?;
        user.role = role;
        Ok(Some(user.clone()))
    }

    async fn upsert_driver(&self, email: &str, name: &str) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.iter_mut().find(|u| u.email == email) {
            user.role = Role::Driver;
            return Ok(user.clone());
        }
        Ok(tables.insert_user(email, name, Role::Driver))
    }

    async fn seed_admin(&self, email: &str, name: &str) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == email) {
            return Ok(false);
        }
        tables.insert_user(email, name, Role::Admin);
        Ok(true)
    }

    async fn insert_ride(&self, ride: NewRide) -> Result<Ride, AppError> {
        let mut tables = self.tables.write().await;
        tables.next_ride_id += 1;
        let row = Ride {
            id: tables.next_ride_id,
            user_id: ride.user_id,
            driver_id: None,
            origin: ride.origin,
            destination: ride.destination,
            status: RideStatus::Pending,
            requested_at: Utc::now(),
            shared_with_email: ride.shared_with_email,
        };
        tables.rides.push(row.clone());
        Ok(row)
    }

    async fn ride(&self, id: i64) -> Result<Option<Ride>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.rides.iter().find(|r| r.id == id).cloned())
    }

    async fn list_rides(&self, filter: RideFilter) -> Result<Vec<Ride>, AppError> {
        let tables = self.tables.read().await;
        let mut rides: Vec<Ride> = tables
            .rides
            .iter()
            .filter(|r| match filter {
                RideFilter::All => true,
                RideFilter::OwnedBy(id) => r.user_id == id,
                RideFilter::DrivenBy(id) => r.driver_id == Some(id),
            })
            .cloned()
            .collect();
        newest_first(&mut rides, |r| (r.requested_at, r.id));
        Ok(rides)
    }

    async fn assign_ride(&self, id: i64, expected: RideVersion, driver_id: i64) -> Result<Option<Ride>, AppError> {
        let mut tables = self.tables.write().await;
        match tables.ride_mut(id) {
            Some(ride) if ride.version() == expected => {
                ride.driver_id = Some(driver_id);
                ride.status = RideStatus::Assigned;
                Ok(Some(ride.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update_ride_status(&self, id: i64, expected: RideVersion, next: RideStatus) -> Result<Option<Ride>, AppError> {
        let mut tables = self.tables.write().await;
        match tables.ride_mut(id) {
            Some(ride) if ride.version() == expected => {
                ride.status = next;
                Ok(Some(ride.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn share_ride(&self, id: i64, email: &str) -> Result<Option<Ride>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables.ride_mut(id).map(|ride| {
            ride.shared_with_email = Some(email.to_string());
            ride.clone()
        }))
    }

    async fn insert_application(&self, application: NewApplication) -> Result<DriverApplication, AppError> {
        let mut tables = self.tables.write().await;
        let pending = tables
            .applications
            .iter()
            .any(|a| a.user_id == application.user_id && a.status == ApplicationStatus::Applied);
        if pending {
            return Err(pending_conflict());
        }
        let applicant = tables
            .users
            .iter()
            .find(|u| u.id == application.user_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        tables.next_application_id += 1;
        let row = DriverApplication {
            id: tables.next_application_id,
            user_id: application.user_id,
            license_number: application.license_number,
            vehicle: application.vehicle,
            notes: application.notes,
            status: ApplicationStatus::Applied,
            submitted_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
            review_notes: None,
            email: applicant.email,
            name: applicant.name,
        };
        tables.applications.push(row.clone());
        Ok(row)
    }

    async fn applications_for_user(&self, user_id: i64, limit: i64) -> Result<Vec<DriverApplication>, AppError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<DriverApplication> = tables
            .applications
            .iter()
            .filter(|a| a.user_id == user_id)
            .map(|a| tables.joined(a))
            .collect();
        newest_first(&mut rows, |a| (a.submitted_at, a.id));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn list_applications(&self, status: Option<ApplicationStatus>) -> Result<Vec<DriverApplication>, AppError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<DriverApplication> = tables
            .applications
            .iter()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .map(|a| tables.joined(a))
            .collect();
        newest_first(&mut rows, |a| (a.submitted_at, a.id));
        Ok(rows)
    }

    async fn review_application(&self, id: i64, review: Review) -> Result<Option<DriverApplication>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(application) = tables.applications.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        application.status.ensure_reviewable()?;
        application.status = review.decision.outcome();
        application.reviewed_at = Some(Utc::now());
        application.reviewed_by = Some(review.reviewer_id);
        if review.notes.is_some() {
            application.review_notes = review.notes;
        }
        let reviewed = application.clone();
        if review.decision == ReviewDecision::Approve {
            if let Some(user) = tables.user_mut(reviewed.user_id).filter(|u| u.role == Role::User) {
                user.role = Role::Driver;
            }
        }
        Ok(Some(tables.joined(&reviewed)))
    }

    async fn reset(&self, scope: ResetScope) -> Result<ResetCounts, AppError> {
        let mut tables = self.tables.write().await;
        let mut counts = ResetCounts::default();
        if scope.includes_applications() {
            counts.applications = tables.applications.len() as u64;
            tables.applications.clear();
        }
        if scope.includes_rides() {
            counts.rides = tables.rides.len() as u64;
            tables.rides.clear();
        }
        Ok(counts)
    }
}
