mod common;

use axum::http::StatusCode;
use levy_server::role::Role;
use levy_server::store::{User, UserStatus};
use serde_json::{json, Value};

#[tokio::test]
async fn health_is_public() {
    let app = common::app();
    let res = app.server.get("/health").await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>(), json!({"status": "ok"}));
}

#[tokio::test]
async fn missing_session_is_401_envelope() {
    let app = common::app();
    let res = app.server.get("/vehicles").await;
    res.assert_status(StatusCode::UNAUTHORIZED);

    let body = res.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["kind"], "unauthenticated");
}

#[tokio::test]
async fn tampered_token_counts_as_no_session() {
    let app = common::app();
    let (_, token) = app.user(Role::Admin);
    let forged = format!("{}00", token);

    let res = app.server.get("/vehicles").authorization_bearer(forged).await;
    res.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn role_without_capability_is_403() {
    let app = common::app();
    let (_, token) = app.user(Role::PosAgent);

    let res = app
        .server
        .post("/vehicles")
        .authorization_bearer(token)
        .json(&json!({"plateNumber": "ABC-123DE", "category": "private"}))
        .await;
    res.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(res.json::<Value>()["error"]["kind"], "forbidden");
}

#[tokio::test]
async fn dashboard_redirects_to_signin_without_session() {
    let app = common::app();
    let res = app.server.get("/dashboard").await;
    res.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(res.header("location"), "/signin");
}

#[tokio::test]
async fn expired_session_redirects_like_a_missing_one() {
    let app = common::app();
    let token = app.token_expiring("u1", Role::Admin, levy_server::now() - 1);

    let res = app.server.get("/dashboard").authorization_bearer(token).await;
    res.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(res.header("location"), "/signin");
}

#[tokio::test]
async fn whitelist_is_closed_to_eirs_admin() {
    let app = common::app();
    let (_, token) = app.user(Role::EirsAdmin);
    app.server
        .get("/whitelisted-ips")
        .authorization_bearer(token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn current_session_lists_capabilities() {
    let app = common::app();
    let (user, token) = app.user(Role::VehicleOwner);

    let res = app.server.get("/auth/session").authorization_bearer(token).await;
    res.assert_status_ok();
    let data = &res.json::<Value>()["data"];
    assert_eq!(data["userId"], user.id);
    assert_eq!(data["role"], "VEHICLE_OWNER");
    let caps: Vec<String> = serde_json::from_value(data["capabilities"].clone()).unwrap();
    assert!(caps.contains(&"request_sticker".to_owned()));
    assert!(!caps.contains(&"manage_users".to_owned()));
}

#[tokio::test]
async fn refresh_reissues_a_verifiable_token() {
    let app = common::app();
    let (user, token) = app.user(Role::LgaAgent);

    let res = app
        .server
        .post("/auth/session/refresh")
        .authorization_bearer(token)
        .await;
    res.assert_status_ok();
    let fresh = res.json::<Value>()["data"]["token"]
        .as_str()
        .unwrap()
        .to_owned();

    let session = app
        .state
        .session_key
        .verify(&fresh, levy_server::now())
        .unwrap();
    assert_eq!(session.user_id, user.id);
    assert_eq!(session.token, common::UPSTREAM_TOKEN);
}

#[tokio::test]
async fn refresh_picks_up_role_changes() {
    let app = common::app();
    let (user, token) = app.user(Role::LgaAgent);
    app.state
        .store
        .update::<User>(&user.id, |u| u.role = Role::LgaAdmin)
        .unwrap();

    let res = app
        .server
        .post("/auth/session/refresh")
        .authorization_bearer(token)
        .await;
    assert_eq!(res.json::<Value>()["data"]["role"], "LGA_ADMIN");
}

#[tokio::test]
async fn blocked_user_cannot_refresh() {
    let app = common::app();
    let (user, token) = app.user(Role::LgaAgent);
    app.state
        .store
        .update::<User>(&user.id, |u| u.status = UserStatus::Blocked)
        .unwrap();

    app.server
        .post("/auth/session/refresh")
        .authorization_bearer(token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn owners_are_turned_away_from_commission_quotes() {
    let app = common::app();
    let (_, owner) = app.user(Role::VehicleOwner);

    app.server
        .get("/transactions")
        .authorization_bearer(&owner)
        .await
        .assert_status_ok();

    let res = app
        .server
        .post("/transactions/quote")
        .authorization_bearer(&owner)
        .json(&json!({"amount": 1000.0}))
        .await;
    res.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(res.json::<Value>()["error"]["kind"], "forbidden");

    let (_, agent) = app.user(Role::PosAgent);
    app.server
        .post("/transactions/quote")
        .authorization_bearer(&agent)
        .json(&json!({"amount": 1000.0}))
        .await
        .assert_status_ok();
}
