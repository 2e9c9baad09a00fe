mod common;

use axum::http::StatusCode;
use levy_server::role::Role;
use serde_json::{json, Value};

#[tokio::test]
async fn quote_uses_configured_rates_by_default() {
    let app = common::app();
    let (_, token) = app.user(Role::LgaAgent);

    let res = app
        .server
        .post("/transactions/quote")
        .authorization_bearer(&token)
        .json(&json!({"amount": 1000.0}))
        .await;
    res.assert_status_ok();
    let quote = &res.json::<Value>()["data"];
    assert_eq!(quote["totalCommission"], 50.0);
    assert_eq!(quote["agentCommission"], 30.0);
    assert_eq!(quote["agencyCommission"], 20.0);
    assert_eq!(quote["payableAmount"], 950.0);

    let res = app
        .server
        .post("/transactions/quote")
        .authorization_bearer(&token)
        .json(&json!({"amount": 1000.0, "mode": "full", "rate": 10.0}))
        .await;
    let quote = &res.json::<Value>()["data"];
    assert_eq!(quote["totalCommission"], 100.0);
    assert_eq!(quote["payableAmount"], 1000.0);
}

#[tokio::test]
async fn shares_over_one_hundred_are_rejected() {
    let app = common::app();
    let (_, token) = app.user(Role::Admin);
    app.server
        .post("/transactions/quote")
        .authorization_bearer(token)
        .json(&json!({"amount": 1000.0, "agentShare": 70.0, "agencyShare": 40.0}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn agents_record_and_see_only_their_transactions() {
    let app = common::app();
    let (_, pos) = app.user(Role::PosAgent);
    let (_, other_pos) = app.user(Role::PosAgent);
    let vehicle = app.vehicle("TX-1", None);

    let res = app
        .server
        .post("/transactions")
        .authorization_bearer(&pos)
        .json(&json!({"vehicleId": vehicle.id, "amount": 2000.0}))
        .await;
    res.assert_status(StatusCode::CREATED);
    let tx = res.json::<Value>()["data"].clone();
    assert_eq!(tx["status"], "PENDING");
    assert_eq!(tx["payableAmount"], 1900.0);
    assert_eq!(tx["payableDisplay"], "₦1,900.00");
    assert!(tx["paymentReference"].as_str().unwrap().starts_with("LVY-"));

    let mine = app
        .server
        .get("/transactions")
        .authorization_bearer(&pos)
        .await
        .json::<Value>();
    assert_eq!(mine["data"]["total"], 1);

    let theirs = app
        .server
        .get("/transactions")
        .authorization_bearer(&other_pos)
        .await
        .json::<Value>();
    assert_eq!(theirs["data"]["total"], 0);
}

#[tokio::test]
async fn final_status_cannot_change() {
    let app = common::app();
    let (_, pos) = app.user(Role::PosAgent);
    let vehicle = app.vehicle("TX-2", None);

    let res = app
        .server
        .post("/transactions")
        .authorization_bearer(&pos)
        .json(&json!({"vehicleId": vehicle.id, "amount": 100.0}))
        .await;
    let id = res.json::<Value>()["data"]["id"]
        .as_str()
        .unwrap()
        .to_owned();

    app.server
        .patch(&format!("/transactions/{id}/status"))
        .authorization_bearer(&pos)
        .json(&json!({"status": "SUCCESS"}))
        .await
        .assert_status_ok();

    app.server
        .patch(&format!("/transactions/{id}/status"))
        .authorization_bearer(&pos)
        .json(&json!({"status": "FAILED"}))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn dashboard_counts_successful_totals() {
    let app = common::app();
    let (_, pos) = app.user(Role::PosAgent);
    let vehicle = app.vehicle("TX-3", None);

    let res = app
        .server
        .post("/transactions")
        .authorization_bearer(&pos)
        .json(&json!({"vehicleId": vehicle.id, "amount": 1000.0}))
        .await;
    let id = res.json::<Value>()["data"]["id"]
        .as_str()
        .unwrap()
        .to_owned();
    app.server
        .patch(&format!("/transactions/{id}/status"))
        .authorization_bearer(&pos)
        .json(&json!({"status": "SUCCESS"}))
        .await
        .assert_status_ok();

    let res = app.server.get("/dashboard").authorization_bearer(&pos).await;
    res.assert_status_ok();
    let data = &res.json::<Value>()["data"];
    assert_eq!(data["vehicles"], 1);
    assert_eq!(data["transactions"]["success"], 1);
    assert_eq!(data["successfulTotalDisplay"], "₦950.00");
}
