mod common;

use axum::http::StatusCode;
use levy_server::role::Role;
use serde_json::{json, Value};

#[tokio::test]
async fn create_then_fetch_vehicle() {
    let app = common::app();
    let (_, token) = app.user(Role::LgaAgent);

    let res = app
        .server
        .post("/vehicles")
        .authorization_bearer(&token)
        .json(&json!({"plateNumber": " abc-123de ", "category": "commercial"}))
        .await;
    res.assert_status(StatusCode::CREATED);
    let created = res.json::<Value>()["data"].clone();
    assert_eq!(created["plateNumber"], "ABC-123DE");
    assert_eq!(created["category"], "COMMERCIAL");
    assert_eq!(created["status"], "ACTIVE");

    let id = created["id"].as_str().unwrap();
    let res = app
        .server
        .get(&format!("/vehicles/{id}"))
        .authorization_bearer(&token)
        .await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["data"]["id"], id);
}

#[tokio::test]
async fn missing_plate_is_a_field_error() {
    let app = common::app();
    let (_, token) = app.user(Role::Admin);

    let res = app
        .server
        .post("/vehicles")
        .authorization_bearer(token)
        .json(&json!({"category": "private"}))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    let error = &res.json::<Value>()["error"];
    assert_eq!(error["kind"], "validation");
    assert_eq!(error["field"], "plateNumber");
}

#[tokio::test]
async fn duplicate_plate_conflicts_until_deleted() {
    let app = common::app();
    let (_, token) = app.user(Role::Admin);
    let existing = app.vehicle("KJA-001AA", None);

    let body = json!({"plateNumber": "KJA-001AA", "category": "private"});
    app.server
        .post("/vehicles")
        .authorization_bearer(&token)
        .json(&body)
        .await
        .assert_status(StatusCode::CONFLICT);

    app.server
        .delete(&format!("/vehicles/{}", existing.id))
        .authorization_bearer(&token)
        .await
        .assert_status_ok();

    app.server
        .post("/vehicles")
        .authorization_bearer(&token)
        .json(&body)
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn soft_deleted_vehicles_disappear_from_reads() {
    let app = common::app();
    let (_, token) = app.user(Role::Admin);
    let gone = app.vehicle("GONE-1", None);
    app.vehicle("KEPT-1", None);

    app.server
        .delete(&format!("/vehicles/{}", gone.id))
        .authorization_bearer(&token)
        .await
        .assert_status_ok();

    app.server
        .get(&format!("/vehicles/{}", gone.id))
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let page = app
        .server
        .get("/vehicles")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(page["data"]["total"], 1);
    assert_eq!(page["data"]["items"][0]["plateNumber"], "KEPT-1");

    // Still on disk for audit.
    assert!(app
        .state
        .store
        .get::<levy_server::store::Vehicle>(&gone.id)
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn listing_is_paged() {
    let app = common::app();
    let (_, token) = app.user(Role::Admin);
    for plate in ["P-1", "P-2", "P-3"] {
        app.vehicle(plate, None);
    }

    let page = app
        .server
        .get("/vehicles")
        .add_query_param("page", 2)
        .add_query_param("perPage", 2)
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    let data = &page["data"];
    assert_eq!(data["total"], 3);
    assert_eq!(data["totalPages"], 2);
    assert_eq!(data["page"], 2);
    assert_eq!(data["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn owners_only_see_their_own_vehicles() {
    let app = common::app();
    let (owner, token) = app.user(Role::VehicleOwner);
    let mine = app.vehicle("MINE-1", Some(&owner.id));
    let theirs = app.vehicle("THEIRS-1", Some("someone-else"));

    let page = app
        .server
        .get("/vehicles")
        .add_query_param("ownerId", "someone-else")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(page["data"]["total"], 1);
    assert_eq!(page["data"]["items"][0]["id"], mine.id);

    app.server
        .get(&format!("/vehicles/{}", theirs.id))
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sticker_requests_follow_the_approval_flow() {
    let app = common::app();
    let (owner, owner_token) = app.user(Role::VehicleOwner);
    let (_, approver_token) = app.user(Role::LgaAdmin);
    let vehicle = app.vehicle("STK-1", Some(&owner.id));

    let res = app
        .server
        .post("/sticker-requests")
        .authorization_bearer(&owner_token)
        .json(&json!({"vehicleId": vehicle.id}))
        .await;
    res.assert_status(StatusCode::CREATED);
    let id = res.json::<Value>()["data"]["id"]
        .as_str()
        .unwrap()
        .to_owned();

    // One pending request per vehicle.
    app.server
        .post("/sticker-requests")
        .authorization_bearer(&owner_token)
        .json(&json!({"vehicleId": vehicle.id}))
        .await
        .assert_status(StatusCode::CONFLICT);

    // Owners cannot approve their own requests.
    app.server
        .post(&format!("/sticker-requests/{id}/approve"))
        .authorization_bearer(&owner_token)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let res = app
        .server
        .post(&format!("/sticker-requests/{id}/approve"))
        .authorization_bearer(&approver_token)
        .await;
    res.assert_status_ok();
    let approved = res.json::<Value>()["data"].clone();
    assert_eq!(approved["status"], "APPROVED");
    assert!(approved["approvedAt"].is_i64());

    app.server
        .post(&format!("/sticker-requests/{id}/reject"))
        .authorization_bearer(&approver_token)
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn malformed_bodies_answer_with_the_envelope() {
    let app = common::app();
    let (_, token) = app.user(Role::LgaAgent);
    let vehicle = app.vehicle("BAD-1", None);

    let res = app
        .server
        .post("/vehicles/virtual-account")
        .authorization_bearer(&token)
        .json(&json!({"vehicleId": vehicle.id, "walletId": 5}))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    let body = res.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["kind"], "validation");
    assert_eq!(body["error"]["field"], "walletId");

    let res = app
        .server
        .post("/vehicles")
        .authorization_bearer(&token)
        .text("plateNumber=ABC")
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>()["error"]["kind"], "validation");
}

#[tokio::test]
async fn malformed_query_strings_answer_with_the_envelope() {
    let app = common::app();
    let (_, token) = app.user(Role::LgaAgent);

    let res = app
        .server
        .get("/vehicles")
        .add_query_param("perPage", "abc")
        .authorization_bearer(&token)
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    let body = res.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["kind"], "validation");
}
