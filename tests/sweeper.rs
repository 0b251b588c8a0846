mod common;

use serde_json::json;
use uuid::Uuid;

fn fresh_sku() -> String {
    format!("sku-{}", Uuid::new_v4().simple())
}

/// S5 — expiry restores stock: a reservation left unconfirmed past its
/// (shortened, for the test) TTL must be reclaimed by a sweeper pass,
/// restoring `available` and leaving an `expire` audit row behind
/// (§4.6, §8 scenario S5).
#[tokio::test]
async fn sweeper_reclaims_expired_reservation_and_restores_stock() {
    let Some(state) = common::test_state_db_with(|s| {
        s.reservation_ttl_seconds = 1;
        s.confirm_grace_seconds = 0;
    })
    .await
    else {
        return;
    };
    let sweeper_state = state.clone();
    let server = common::test_server(state).await;
    let sku = fresh_sku();
    let token = common::jwt_for("expiry-buyer");

    server
        .post(&format!("/api/v1/inventory/{sku}/initialize?quantity=5"))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let res = server
        .post("/api/v1/inventory/reserve")
        .add_header("Authorization", format!("Bearer {token}"))
        .json(&json!({"sku": sku, "quantity": 3}))
        .await;
    res.assert_status(axum::http::StatusCode::CREATED);
    let reservation_id = res.json::<serde_json::Value>()["reservation_id"]
        .as_str()
        .unwrap()
        .to_string();

    let res = server.get(&format!("/api/v1/inventory/{sku}")).await;
    assert_eq!(res.json::<serde_json::Value>()["available"], 2);

    // Wait well past the 1-second TTL before sweeping.
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    holdfast_backend::workers::sweeper::run_once(&sweeper_state).await;

    let res = server.get(&format!("/api/v1/inventory/{sku}")).await;
    assert_eq!(res.json::<serde_json::Value>()["available"], 5);

    let expire_rows: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM audit_log WHERE reservation_id = $1 AND event_type = 'expire'",
    )
    .bind(&reservation_id)
    .fetch_one(&sweeper_state.db)
    .await
    .unwrap();
    assert_eq!(expire_rows, 1, "sweeper must leave an expire audit row behind");

    // The reservation is gone; confirming it now surfaces not_found.
    let res = server
        .post("/api/v1/checkout/confirm")
        .add_header("Authorization", format!("Bearer {token}"))
        .json(&json!({"reservation_id": reservation_id}))
        .await;
    res.assert_status(axum::http::StatusCode::NOT_FOUND);
}
