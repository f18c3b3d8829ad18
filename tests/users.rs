mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{TestApp, ADMIN};
use serde_json::json;

#[tokio::test]
async fn signup_issues_a_working_token() {
    let app = TestApp::new().await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/users/signup",
            None,
            Some(json!({ "name": "Sam", "email": "Sam@Example.com", "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["user"]["email"], "sam@example.com");
    assert_eq!(body["user"]["role"], "user");
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = app.call_with_token(Method::GET, "/api/users/me", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Sam");

    let (status, _) = app.call_with_token(Method::GET, "/api/users/me", "garbage", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_reflects_role_changes_immediately() {
    let app = TestApp::new().await;
    let (_, body) = app
        .call(Method::POST, "/api/users/login", None, Some(json!({ "email": "t@example.com" })))
        .await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = app.call_with_token(Method::GET, "/api/rides/driver", &token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.make_driver("t@example.com").await;
    let (status, _) = app.call_with_token(Method::GET, "/api/rides/driver", &token, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn production_ignores_the_email_header() {
    let app = TestApp::production().await;
    let (status, body) = app.call(Method::GET, "/api/users/me", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Unauthorized" }));

    let (status, body) = app
        .call(Method::POST, "/api/users/login", None, Some(json!({ "email": ADMIN })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "admin");
    let token = body["token"].as_str().unwrap().to_string();
    let (status, _) = app.call_with_token(Method::GET, "/admin/users", &token, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_input_gets_the_error_shape() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/users/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("invalid JSON body"));

    let (status, body) = app
        .call(Method::POST, "/api/users/login", None, Some(json!({ "email": "   " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "email is required" }));

    let (status, body) = app.call(Method::GET, "/api/rides/abc", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn oversized_bodies_and_unknown_routes_keep_the_error_shape() {
    let app = TestApp::new().await;
    app.login("rider@example.com").await;

    let padding = "x".repeat(70 * 1024);
    let payload = json!({ "origin": padding, "destination": "TestTown" }).to_string();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/rides")
        .header("x-user-email", "rider@example.com")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, payload.len())
        .body(Body::from(payload))
        .unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body, json!({ "error": "Request body too large" }));

    let (status, body) = app.call(Method::GET, "/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Not found" }));

    let (status, body) = app.call(Method::GET, "/api/rides/1/missing", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Not found" }));
}

#[tokio::test]
async fn system_routes_answer() {
    let app = TestApp::new().await;
    let (status, body) = app.call(Method::GET, "/ping", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "pong");

    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["baseUrl"], app.state.config.base_url.as_str());

    let (status, body) = app.call(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let (status, headers, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("UrbanDrive"));
    assert!(headers.contains_key("x-request-id"));
}
