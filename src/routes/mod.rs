//! Route groups. Each takes the shared state and returns a stateless `Router` for nesting.

mod admin;
mod applications;
mod common;
mod rides;
mod users;

pub use admin::admin_routes;
pub use applications::application_routes;
pub use common::common_routes;
pub use rides::{driver_routes, ride_routes};
pub use users::user_routes;
