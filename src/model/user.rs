//! Users, roles and the capabilities each role grants.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Driver,
    Admin,
}

/// What an identity is allowed to do. Routes ask for a capability, never for a role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    BookRide,
    ViewOwnRides,
    ShareRide,
    CancelRide,
    ApplyAsDriver,
    ViewAssignedRides,
    DriveRide,
    ListAllRides,
    AssignDriver,
    Administer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Driver, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Driver => "driver",
            Role::Admin => "admin",
        }
    }

    pub fn grants(self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Role::Admin => true,
            Role::Driver => !matches!(capability, ListAllRides | AssignDriver | Administer),
            Role::User => matches!(capability, BookRide | ViewOwnRides | ShareRide | CancelRide | ApplyAsDriver),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "driver" => Ok(Role::Driver),
            "admin" => Ok(Role::Admin),
            _ => Err(AppError::BadRequest("role must be one of: user, driver, admin".into())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// True when a role change would take admin rights away from someone.
pub fn is_admin_demotion(current: Role, next: Role) -> bool {
    current == Role::Admin && next != Role::Admin
}

/// Refuses demoting the last remaining admin. `admin_count` includes the target.
pub fn ensure_admin_remains(current: Role, next: Role, admin_count: usize) -> Result<(), AppError> {
    if is_admin_demotion(current, next) && admin_count <= 1 {
        return Err(AppError::BadRequest("Cannot remove the last admin".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_roles_case_insensitively() {
        assert_eq!(" Driver ".parse::<Role>().unwrap(), Role::Driver);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn capabilities_follow_role_allow_list() {
        assert!(Role::User.grants(Capability::BookRide));
        assert!(!Role::User.grants(Capability::DriveRide));
        assert!(Role::Driver.grants(Capability::DriveRide));
        assert!(Role::Driver.grants(Capability::BookRide));
        assert!(!Role::Driver.grants(Capability::AssignDriver));
        assert!(Role::ALL.iter().all(|r| r.grants(Capability::ApplyAsDriver)));
        assert!(Role::Admin.grants(Capability::Administer));
    }

    #[test]
    fn last_admin_cannot_be_demoted() {
        assert!(ensure_admin_remains(Role::Admin, Role::User, 1).is_err());
        assert!(ensure_admin_remains(Role::Admin, Role::Driver, 2).is_ok());
        assert!(ensure_admin_remains(Role::Admin, Role::Admin, 1).is_ok());
        assert!(ensure_admin_remains(Role::User, Role::Driver, 0).is_ok());
    }
}
