mod actor;
mod json;

pub use actor::Actor;
pub use json::{JsonBody, PathParam, QueryParams};
