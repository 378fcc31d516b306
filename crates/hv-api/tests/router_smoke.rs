use axum::{body::Body, http::Request, http::StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn livez_healthy_and_profile_requires_auth() {
    let state = hv_api::test_state();
    let app = hv_api::create_router(state);

    let livez_response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/livez")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(livez_response.status(), StatusCode::OK);

    let unauthorized = app
        .oneshot(
            Request::builder()
                .uri("/api/users/profile")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_bearer_token_is_rejected_with_the_auth_message() {
    let state = hv_api::test_state();
    let app = hv_api::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/users/profile")
                .header("authorization", "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["code"], "unauthorized");
    assert_eq!(json["message"], "Invalid or expired token.");
}

#[tokio::test]
async fn register_validates_credentials_before_the_identity_call() {
    // test_state points the identity client at a port nothing listens on, so
    // a 400 here proves validation short-circuits before any provider call.
    let state = hv_api::test_state();
    let app = hv_api::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response.into_body()).await;
    assert_eq!(json["code"], "bad_request");
    assert_eq!(json["message"], "Email and password are required");
}

#[tokio::test]
async fn caller_request_id_is_echoed_in_header_and_error_body() {
    let state = hv_api::test_state();
    let app = hv_api::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/users/profile")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok()),
        Some("req-42")
    );

    let json = body_json(response.into_body()).await;
    assert_eq!(json["request_id"], "req-42");
}
