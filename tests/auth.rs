mod common;

use serde_json::json;
use uuid::Uuid;

fn fresh_user_id() -> String {
    format!("user-{}", Uuid::new_v4().simple())
}

#[tokio::test]
async fn register_then_login_returns_a_bearer_token() {
    let Some(state) = common::test_state_db().await else {
        return;
    };
    let server = common::test_server(state).await;
    let user_id = fresh_user_id();

    let res = server
        .post("/api/v1/auth/register")
        .json(&json!({"user_id": user_id, "password": "correcthorse"}))
        .await;
    res.assert_status(axum::http::StatusCode::CREATED);

    let res = server
        .post("/api/v1/auth/login")
        .json(&json!({"user_id": user_id, "password": "correcthorse"}))
        .await;
    res.assert_status_ok();
    let body = res.json::<serde_json::Value>();
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["access_token"].as_str().unwrap().len() > 10);
}

#[tokio::test]
async fn registering_the_same_user_id_twice_conflicts() {
    let Some(state) = common::test_state_db().await else {
        return;
    };
    let server = common::test_server(state).await;
    let user_id = fresh_user_id();

    server
        .post("/api/v1/auth/register")
        .json(&json!({"user_id": user_id, "password": "correcthorse"}))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let res = server
        .post("/api/v1/auth/register")
        .json(&json!({"user_id": user_id, "password": "correcthorse"}))
        .await;
    res.assert_status(axum::http::StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_with_the_wrong_password_is_unauthenticated() {
    let Some(state) = common::test_state_db().await else {
        return;
    };
    let server = common::test_server(state).await;
    let user_id = fresh_user_id();

    server
        .post("/api/v1/auth/register")
        .json(&json!({"user_id": user_id, "password": "correcthorse"}))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let res = server
        .post("/api/v1/auth/login")
        .json(&json!({"user_id": user_id, "password": "wrong-password"}))
        .await;
    res.assert_status(axum::http::StatusCode::UNAUTHORIZED);
}
