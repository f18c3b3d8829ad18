//! Router assembly, store bootstrap and the serve loop.

use crate::config::{Config, StorageBackend};
use crate::error::AppError;
use crate::migration::apply_migrations;
use crate::routes::{admin_routes, application_routes, common_routes, driver_routes, ride_routes, user_routes};
use crate::state::AppState;
use crate::store::{ensure_database_exists, MemoryStore, PgStore, Store};
use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Request},
    BoxError, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use std::time::Duration;
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const BODY_LIMIT_BYTES: usize = 64 * 1024;

#[derive(Clone, Copy, Default)]
struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string()).ok().map(RequestId::new)
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found".into())
}

async fn middleware_error(err: BoxError) -> AppError {
    AppError::from(err)
}

/// Deadline for each request; an elapsed one answers 408 in the usual error shape.
fn with_deadline(router: Router, timeout: Duration) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(middleware_error))
            .layer(TimeoutLayer::new(timeout)),
    )
}

/// Full application router with middleware. An incoming `x-request-id` is kept.
pub fn router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let timeout = state.config.request_timeout;

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        tracing::info_span!("request", method = %request.method(), uri = %request.uri(), request_id = %id)
    });

    let routes = Router::new()
        .merge(common_routes(state.clone()))
        .nest("/api/users", user_routes(state.clone()))
        .nest("/api/rides", ride_routes(state.clone()))
        .nest("/api/driver", driver_routes(state.clone()))
        .nest("/api/driver-applications", application_routes(state.clone()))
        .nest("/admin", admin_routes(state))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES));

    with_deadline(routes, timeout).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), UuidRequestId))
            .layer(trace)
            .layer(PropagateRequestIdLayer::new(request_id))
            .layer(CorsLayer::permissive()),
    )
}

/// Opens the configured backend. For Postgres the database is created if missing and
/// the schema applied before the pool is handed out.
pub async fn connect_store(config: &Config) -> Result<Arc<dyn Store>, AppError> {
    match config.storage {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory store, data is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            ensure_database_exists(&config.database_url).await?;
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&config.database_url)
                .await?;
            apply_migrations(&pool).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

pub async fn serve(state: AppState) -> Result<(), AppError> {
    let addr = state.config.bind_addr();
    let base_url = state.config.base_url.clone();
    let app = router(state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %listener.local_addr()?, base_url = %base_url, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
