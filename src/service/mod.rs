//! Use cases. Each service checks the actor's capability first, then validates input and
//! delegates persistence to a [`crate::store::Store`].

mod admin;
mod applications;
mod rides;
mod users;
pub mod validation;

pub use admin::AdminService;
pub use applications::{ApplicationService, RECENT_APPLICATIONS};
pub use rides::{permit, RideService};
pub use users::UserService;

use crate::error::AppError;
use crate::model::{Capability, User};

pub fn authorize(actor: &User, capability: Capability) -> Result<(), AppError> {
    if actor.role.grants(capability) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Forbidden".into()))
    }
}
