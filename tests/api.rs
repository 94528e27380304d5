//! Router tests for requests that are answered before any query runs.

use axum::{
    body::{to_bytes, Body},
    extract::FromRef,
    http::{header, Request, StatusCode},
    Router,
};
use pantry::{app::build_app, auth::JwtKeys, state::AppState};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

fn app() -> (Router, JwtKeys) {
    let state = AppState::fake();
    let keys = JwtKeys::from_ref(&state);
    (build_app(state), keys)
}

fn bearer(keys: &JwtKeys, user: Uuid) -> String {
    format!("Bearer {}", keys.sign_access(user).unwrap())
}

async fn body_json(res: axum::response::Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let (app, _) = app();
    let res = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn anonymous_download_is_unauthorized() {
    let (app, _) = app();
    let res = app
        .oneshot(
            Request::get("/api/recipes/download_shopping_cart")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(body_json(res).await["detail"].is_string());
}

#[tokio::test]
async fn anonymous_recipe_create_is_unauthorized() {
    let (app, _) = app();
    let res = app
        .oneshot(
            Request::post("/api/recipes")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_ingredient_is_rejected_before_store() {
    let (app, keys) = app();
    let ingredient = Uuid::new_v4();
    let payload = json!({
        "ingredients": [
            {"id": ingredient, "amount": 10},
            {"id": ingredient, "amount": 20}
        ],
        "tags": [Uuid::new_v4()],
        "image": PNG,
        "name": "Soup",
        "text": "Boil.",
        "cooking_time": 30
    });
    let res = app
        .oneshot(
            Request::post("/api/recipes")
                .header(header::AUTHORIZATION, bearer(&keys, Uuid::new_v4()))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert!(body["ingredients"].is_array());
}

#[tokio::test]
async fn self_subscription_is_rejected_before_store() {
    let (app, keys) = app();
    let me = Uuid::new_v4();
    let res = app
        .oneshot(
            Request::post(format!("/api/users/{}/subscribe", me))
                .header(header::AUTHORIZATION, bearer(&keys, me))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(res).await["author"].is_array());
}

#[tokio::test]
async fn malformed_recipes_limit_is_rejected() {
    let (app, keys) = app();
    let res = app
        .oneshot(
            Request::get("/api/users/subscriptions?recipes_limit=lots")
                .header(header::AUTHORIZATION, bearer(&keys, Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(res).await["recipes_limit"].is_array());
}

#[tokio::test]
async fn refresh_token_cannot_authenticate() {
    let state = AppState::fake();
    let token = JwtKeys::from_ref(&state).sign_refresh(Uuid::new_v4()).unwrap();
    let res = build_app(state)
        .oneshot(
            Request::get("/api/users/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}
