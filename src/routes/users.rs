use crate::handlers::users::{login, me, signup};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// Mounted at `/api/users`.
pub fn user_routes(state: AppState) -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/me", get(me))
        .with_state(state)
}
