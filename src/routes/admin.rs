use crate::handlers::admin::{
    approve_application, approve_driver, change_role, decide_application, list_applications, list_users,
    reject_application, reset, revoke_driver,
};
use crate::state::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};

/// Mounted at `/admin`. Every handler requires the `Administer` capability.
pub fn admin_routes(state: AppState) -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id/role", patch(change_role))
        .route("/drivers/approve", post(approve_driver))
        .route("/drivers/revoke", post(revoke_driver))
        .route("/driver-apps", get(list_applications))
        .route("/driver-apps/:id/decision", patch(decide_application))
        .route("/driver-applications", get(list_applications))
        .route("/driver-applications/:id/approve", post(approve_application))
        .route("/driver-applications/:id/reject", post(reject_application))
        .route("/reset", post(reset))
        .with_state(state)
}
