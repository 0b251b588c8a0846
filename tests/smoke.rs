mod common;

#[tokio::test]
async fn health_ok() {
    let Some(state) = common::test_state_db().await else {
        return;
    };
    let server = common::test_server(state).await;

    let res = server.get("/health").await;
    res.assert_status_ok();

    let body = res.json::<serde_json::Value>();
    assert_eq!(body["status"], "ok");
    assert!(body.get("redis").is_some());
}

#[tokio::test]
async fn openapi_json_ok() {
    let Some(state) = common::test_state_db().await else {
        return;
    };
    let server = common::test_server(state).await;

    let res = server.get("/api-docs/openapi.json").await;
    res.assert_status_ok();

    let json = res.json::<serde_json::Value>();
    assert!(json.get("openapi").is_some());
    assert!(json.get("paths").is_some());
    assert!(json["paths"]
        .as_object()
        .unwrap()
        .contains_key("/api/v1/inventory/reserve"));
}

#[tokio::test]
async fn request_id_header_present() {
    let Some(state) = common::test_state_db().await else {
        return;
    };
    let server = common::test_server(state).await;

    let res = server.get("/health").await;
    res.assert_status_ok();
    assert!(res.headers().get("x-request-id").is_some());
}
