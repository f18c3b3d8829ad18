//! Driver applications: a user's request to be promoted to driver, reviewed once by an admin.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "driver_app_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Applied,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// Only `applied` applications can be reviewed; the outcome is final.
    pub fn ensure_reviewable(self) -> Result<(), AppError> {
        if self != ApplicationStatus::Applied {
            return Err(AppError::BadRequest("Application has already been reviewed".into()));
        }
        Ok(())
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "applied" => Ok(ApplicationStatus::Applied),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            _ => Err(AppError::BadRequest(
                "status must be one of: applied, approved, rejected".into(),
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn outcome(self) -> ApplicationStatus {
        match self {
            ReviewDecision::Approve => ApplicationStatus::Approved,
            ReviewDecision::Reject => ApplicationStatus::Rejected,
        }
    }
}

impl std::str::FromStr for ReviewDecision {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "approve" => Ok(ReviewDecision::Approve),
            "reject" => Ok(ReviewDecision::Reject),
            _ => Err(AppError::BadRequest("action must be 'approve' or 'reject'".into())),
        }
    }
}

/// Application row joined with the applicant's email and name.
#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DriverApplication {
    pub id: i64,
    pub user_id: i64,
    pub license_number: Option<String>,
    pub vehicle: Option<String>,
    pub notes: Option<String>,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<i64>,
    pub review_notes: Option<String>,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewApplication {
    pub user_id: i64,
    pub license_number: Option<String>,
    pub vehicle: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Review {
    pub reviewer_id: i64,
    pub decision: ReviewDecision,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decisions_map_to_terminal_statuses() {
        assert_eq!("approve".parse::<ReviewDecision>().unwrap().outcome(), ApplicationStatus::Approved);
        assert_eq!("Reject".parse::<ReviewDecision>().unwrap().outcome(), ApplicationStatus::Rejected);
        assert!("maybe".parse::<ReviewDecision>().is_err());
    }

    #[test]
    fn reviewed_applications_are_final() {
        assert!(ApplicationStatus::Applied.ensure_reviewable().is_ok());
        assert!(ApplicationStatus::Approved.ensure_reviewable().is_err());
        assert!(ApplicationStatus::Rejected.ensure_reviewable().is_err());
    }
}
