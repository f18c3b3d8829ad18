//! Rides and the ride status state machine.
//!
//! `RideStatus::can_advance_to` is the only transition table; drivers move strictly
//! along it, admins may override it between non-terminal states. Nobody leaves
//! `completed` or `cancelled`.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ride_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RideStatus {
    Pending,
    Assigned,
    Accepted,
    Enroute,
    Arrived,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RideStatus::Pending => "pending",
            RideStatus::Assigned => "assigned",
            RideStatus::Accepted => "accepted",
            RideStatus::Enroute => "enroute",
            RideStatus::Arrived => "arrived",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }

    /// States reachable from `self` in one step.
    pub fn next_steps(self) -> &'static [RideStatus] {
        use RideStatus::*;
        match self {
            Pending => &[Assigned, Cancelled],
            Assigned => &[Accepted, Cancelled],
            Accepted => &[Enroute, Cancelled],
            Enroute => &[Arrived, Cancelled],
            Arrived => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_advance_to(self, next: RideStatus) -> bool {
        self.next_steps().contains(&next)
    }

    /// Targets a driver may request through the status endpoint.
    pub fn is_driver_target(self) -> bool {
        !matches!(self, RideStatus::Pending | RideStatus::Assigned)
    }

    /// States that only make sense with a driver on the ride.
    pub fn needs_driver(self) -> bool {
        matches!(
            self,
            RideStatus::Assigned | RideStatus::Accepted | RideStatus::Enroute | RideStatus::Arrived | RideStatus::Completed
        )
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RideStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(RideStatus::Pending),
            "assigned" => Ok(RideStatus::Assigned),
            "accepted" => Ok(RideStatus::Accepted),
            "enroute" => Ok(RideStatus::Enroute),
            "arrived" => Ok(RideStatus::Arrived),
            "completed" => Ok(RideStatus::Completed),
            "cancelled" | "canceled" => Ok(RideStatus::Cancelled),
            _ => Err(AppError::BadRequest("Invalid status".into())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    pub id: i64,
    pub user_id: i64,
    pub driver_id: Option<i64>,
    pub origin: String,
    pub destination: String,
    pub status: RideStatus,
    pub requested_at: DateTime<Utc>,
    pub shared_with_email: Option<String>,
}

impl Ride {
    pub fn version(&self) -> RideVersion {
        RideVersion {
            status: self.status,
            driver_id: self.driver_id,
        }
    }
}

/// What a guarded ride write compares against: the write only lands if neither the
/// status nor the driver changed since the ride was read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RideVersion {
    pub status: RideStatus,
    pub driver_id: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct NewRide {
    pub user_id: i64,
    pub origin: String,
    pub destination: String,
    pub shared_with_email: Option<String>,
}

/// Which rides a listing returns. Listings are newest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RideFilter {
    All,
    OwnedBy(i64),
    DrivenBy(i64),
}
