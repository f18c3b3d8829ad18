use crate::handlers::driver::{accept, update_status};
use crate::handlers::rides::{assign, cancel, complete, create, list_all, list_assigned, list_mine, read, share};
use crate::state::AppState;
use axum::{
    routing::{get, patch},
    Router,
};

/// Mounted at `/api/rides`. Static segments win over `/:id`.
pub fn ride_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_all).post(create))
        .route("/user", get(list_mine))
        .route("/driver", get(list_assigned))
        .route("/:id", get(read))
        .route("/:id/assign", patch(assign))
        .route("/:id/share", patch(share))
        .route("/:id/complete", patch(complete))
        .route("/:id/cancel", patch(cancel))
        .with_state(state)
}

/// Mounted at `/api/driver`.
pub fn driver_routes(state: AppState) -> Router {
    Router::new()
        .route("/accept/:id", patch(accept))
        .route("/status/:id", patch(update_status))
        .with_state(state)
}
