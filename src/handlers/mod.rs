//! HTTP handlers. Each one unpacks the request, calls a service and wraps the result.

pub mod admin;
pub mod applications;
pub mod driver;
pub mod rides;
pub mod users;
