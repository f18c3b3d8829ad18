#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use urbandrive::{
    router, service::UserService, AppState, Config, Environment, MemoryStore, StorageBackend, Store,
};

pub const ADMIN: &str = "admin@example.com";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_environment(Environment::Development).await
    }

    pub async fn production() -> Self {
        Self::with_environment(Environment::Production).await
    }

    async fn with_environment(environment: Environment) -> Self {
        let config = Config {
            environment,
            jwt_secret: "integration-secret".into(),
            admin_emails: vec![ADMIN.to_string()],
            storage: StorageBackend::Memory,
            ..Config::default()
        };
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        UserService::seed_admins(store.as_ref(), &config.admin_emails)
            .await
            .unwrap();
        let state = AppState::new(store, config);
        TestApp {
            app: router(state.clone()),
            state,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, headers, body)
    }

    /// Request identified through the development `x-user-email` header.
    pub async fn call(&self, method: Method, uri: &str, email: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(email) = email {
            builder = builder.header("x-user-email", email);
        }
        let (status, _, body) = self.send(with_body(builder, body)).await;
        (status, body)
    }

    pub async fn call_with_token(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token));
        let (status, _, body) = self.send(with_body(builder, body)).await;
        (status, body)
    }

    /// Logs in (creating the account) and returns the user's id.
    pub async fn login(&self, email: &str) -> i64 {
        let (status, body) = self
            .call(Method::POST, "/api/users/login", None, Some(serde_json::json!({ "email": email })))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["user"]["id"].as_i64().unwrap()
    }

    pub async fn make_driver(&self, email: &str) {
        let (status, body) = self
            .call(
                Method::POST,
                "/admin/drivers/approve",
                Some(ADMIN),
                Some(serde_json::json!({ "email": email })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }

    pub async fn book(&self, email: &str, origin: &str, destination: &str) -> i64 {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/rides",
                Some(email),
                Some(serde_json::json!({ "origin": origin, "destination": destination })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }
}

fn with_body(builder: axum::http::request::Builder, body: Option<Value>) -> Request<Body> {
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
