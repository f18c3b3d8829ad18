//! UrbanDrive: ride-hailing demo backend. Users book rides, admins assign drivers,
//! drivers move rides through their lifecycle, and admins review driver applications.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod identity;
pub mod migration;
pub mod model;
pub mod response;
pub mod routes;
pub mod server;
pub mod service;
pub mod state;
pub mod store;

pub use config::{Config, Environment, StorageBackend};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use server::{connect_store, router, serve};
pub use state::AppState;
pub use store::{ensure_database_exists, MemoryStore, PgStore, Store};
