pub mod application;
pub mod ride;
pub mod user;

pub use application::*;
pub use ride::*;
pub use user::*;
