//! Response envelopes and status helpers.

use crate::model::{DriverApplication, Ride, Role, User};
use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct Rides {
    pub rides: Vec<Ride>,
}

#[derive(Serialize)]
pub struct RideUpdate {
    pub message: &'static str,
    pub ride: Ride,
}

#[derive(Serialize)]
pub struct UserBody {
    pub user: User,
}

#[derive(Serialize)]
pub struct Session {
    pub user: User,
    pub token: String,
}

#[derive(Serialize)]
pub struct Users {
    pub users: Vec<User>,
}

#[derive(Serialize)]
pub struct UserUpdate {
    pub message: &'static str,
    pub user: User,
}

#[derive(Serialize)]
pub struct RoleUpdate {
    pub message: &'static str,
    pub id: i64,
    pub role: Role,
}

#[derive(Serialize)]
pub struct ApplicationBody {
    pub application: DriverApplication,
}

#[derive(Serialize)]
pub struct ApplicationUpdate {
    pub message: &'static str,
    pub application: DriverApplication,
}

#[derive(Serialize)]
pub struct Applications {
    pub applications: Vec<DriverApplication>,
}

#[derive(Serialize)]
pub struct ResetSummary {
    pub message: &'static str,
    pub rides: u64,
    pub applications: u64,
}

pub fn created<T: Serialize>(body: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(body))
}

pub fn ok<T: Serialize>(body: T) -> (StatusCode, Json<T>) {
    (StatusCode::OK, Json(body))
}
