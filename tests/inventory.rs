mod common;

use std::sync::Arc;

use serde_json::json;
use tokio::sync::Barrier;
use uuid::Uuid;

fn fresh_sku() -> String {
    format!("sku-{}", Uuid::new_v4().simple())
}

#[tokio::test]
async fn initialize_then_status_reports_full_availability() {
    let Some(state) = common::test_state_db().await else {
        return;
    };
    let server = common::test_server(state).await;
    let sku = fresh_sku();

    let res = server.post(&format!("/api/v1/inventory/{sku}/initialize?quantity=10")).await;
    res.assert_status(axum::http::StatusCode::CREATED);

    let res = server.get(&format!("/api/v1/inventory/{sku}")).await;
    res.assert_status_ok();
    let body = res.json::<serde_json::Value>();
    assert_eq!(body["available"], 10);
    assert_eq!(body["reserved"], 0);
    assert_eq!(body["total"], 10);
}

#[tokio::test]
async fn reserve_decrements_available_and_exact_fill_succeeds() {
    let Some(state) = common::test_state_db().await else {
        return;
    };
    let server = common::test_server(state).await;
    let sku = fresh_sku();
    let token = common::jwt_for("buyer-1");

    server
        .post(&format!("/api/v1/inventory/{sku}/initialize?quantity=3"))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    // S2: exact-fill reservation for all remaining units must succeed.
    let res = server
        .post("/api/v1/inventory/reserve")
        .add_header("Authorization", format!("Bearer {token}"))
        .json(&json!({"sku": sku, "quantity": 3}))
        .await;
    res.assert_status(axum::http::StatusCode::CREATED);
    let body = res.json::<serde_json::Value>();
    assert!(body["reservation_id"].as_str().unwrap().starts_with("rsv_"));

    let res = server.get(&format!("/api/v1/inventory/{sku}")).await;
    let body = res.json::<serde_json::Value>();
    assert_eq!(body["available"], 0);
    assert_eq!(body["reserved"], 3);
}

#[tokio::test]
async fn reserve_beyond_available_is_rejected_with_409() {
    let Some(state) = common::test_state_db().await else {
        return;
    };
    let server = common::test_server(state).await;
    let sku = fresh_sku();
    let token = common::jwt_for("buyer-2");

    server
        .post(&format!("/api/v1/inventory/{sku}/initialize?quantity=1"))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    // S3: oversell attempt must be rejected and leave stock untouched.
    let res = server
        .post("/api/v1/inventory/reserve")
        .add_header("Authorization", format!("Bearer {token}"))
        .json(&json!({"sku": sku, "quantity": 2}))
        .await;
    res.assert_status(axum::http::StatusCode::CONFLICT);

    let res = server.get(&format!("/api/v1/inventory/{sku}")).await;
    let body = res.json::<serde_json::Value>();
    assert_eq!(body["available"], 1);
}

#[tokio::test]
async fn duplicate_idempotency_key_replays_the_first_reservation() {
    let Some(state) = common::test_state_db().await else {
        return;
    };
    let server = common::test_server(state).await;
    let sku = fresh_sku();
    let token = common::jwt_for("buyer-3");
    let idempotency_key = format!("idem-{}", Uuid::new_v4());

    server
        .post(&format!("/api/v1/inventory/{sku}/initialize?quantity=5"))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let first = server
        .post("/api/v1/inventory/reserve")
        .add_header("Authorization", format!("Bearer {token}"))
        .add_header("x-idempotency-key", idempotency_key.clone())
        .json(&json!({"sku": sku, "quantity": 2}))
        .await;
    first.assert_status(axum::http::StatusCode::CREATED);
    let first_body = first.json::<serde_json::Value>();

    // S4: replaying the same key must return the same reservation rather
    // than decrementing stock a second time.
    let second = server
        .post("/api/v1/inventory/reserve")
        .add_header("Authorization", format!("Bearer {token}"))
        .add_header("x-idempotency-key", idempotency_key)
        .json(&json!({"sku": sku, "quantity": 2}))
        .await;
    second.assert_status(axum::http::StatusCode::CREATED);
    let second_body = second.json::<serde_json::Value>();

    assert_eq!(first_body["reservation_id"], second_body["reservation_id"]);

    let res = server.get(&format!("/api/v1/inventory/{sku}")).await;
    let body = res.json::<serde_json::Value>();
    assert_eq!(body["available"], 3);
}

#[tokio::test]
async fn reserve_rejects_quantity_outside_configured_bounds() {
    let Some(state) = common::test_state_db().await else {
        return;
    };
    let server = common::test_server(state).await;
    let sku = fresh_sku();
    let token = common::jwt_for("buyer-4");

    server
        .post(&format!("/api/v1/inventory/{sku}/initialize?quantity=50"))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let res = server
        .post("/api/v1/inventory/reserve")
        .add_header("Authorization", format!("Bearer {token}"))
        .json(&json!({"sku": sku, "quantity": 999}))
        .await;
    res.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reserve_requires_a_bearer_token() {
    let Some(state) = common::test_state_db().await else {
        return;
    };
    let server = common::test_server(state).await;
    let sku = fresh_sku();

    server
        .post(&format!("/api/v1/inventory/{sku}/initialize?quantity=1"))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let res = server
        .post("/api/v1/inventory/reserve")
        .json(&json!({"sku": sku, "quantity": 1}))
        .await;
    res.assert_status(axum::http::StatusCode::UNAUTHORIZED);
}

/// S1 — last-item race: many distinct principals fire concurrent
/// quantity-1 reserves against a single remaining unit. Exactly one may
/// succeed; the rest must see `insufficient_inventory` with `available:
/// 0`, and the stock must never go negative (§8 invariant 1, scenario S1).
#[tokio::test]
async fn last_item_race_admits_exactly_one_winner() {
    let Some(state) = common::test_state_db().await else {
        return;
    };
    let server = Arc::new(common::test_server(state).await);
    let sku = fresh_sku();

    server
        .post(&format!("/api/v1/inventory/{sku}/initialize?quantity=1"))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    const CONCURRENCY: usize = 40;
    let barrier = Arc::new(Barrier::new(CONCURRENCY));
    let mut handles = Vec::with_capacity(CONCURRENCY);

    for i in 0..CONCURRENCY {
        let server = Arc::clone(&server);
        let barrier = Arc::clone(&barrier);
        let sku = sku.clone();
        let token = common::jwt_for(&format!("racer-{i}"));
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            server
                .post("/api/v1/inventory/reserve")
                .add_header("Authorization", format!("Bearer {token}"))
                .json(&json!({"sku": sku, "quantity": 1}))
                .await
                .status_code()
        }));
    }

    let mut created = 0;
    let mut conflicted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            axum::http::StatusCode::CREATED => created += 1,
            axum::http::StatusCode::CONFLICT => conflicted += 1,
            other => panic!("unexpected status from concurrent reserve: {other}"),
        }
    }

    assert_eq!(created, 1, "exactly one racer must win the last unit");
    assert_eq!(conflicted, CONCURRENCY - 1);

    let res = server.get(&format!("/api/v1/inventory/{sku}")).await;
    assert_eq!(res.json::<serde_json::Value>()["available"], 0);
}
