use crate::handlers::applications::{apply, mine};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// Mounted at `/api/driver-applications`.
pub fn application_routes(state: AppState) -> Router {
    Router::new()
        .route("/apply", post(apply))
        .route("/mine", get(mine))
        .with_state(state)
}
