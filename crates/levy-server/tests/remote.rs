mod common;

use axum::http::StatusCode;
use levy_server::role::Role;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn virtual_account_without_wallet_never_reaches_the_remote() {
    let remote = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&remote)
        .await;

    let app = common::app_with_remote(Some(&remote.uri()));
    let (_, token) = app.user(Role::LgaAgent);
    let vehicle = app.vehicle("VA-1", None);

    let res = app
        .server
        .post("/vehicles/virtual-account")
        .authorization_bearer(token)
        .json(&json!({"vehicleId": vehicle.id}))
        .await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>()["error"]["field"], "walletId");
}

#[tokio::test]
async fn virtual_account_forwards_credentials() {
    let remote = MockServer::start().await;
    let app = common::app_with_remote(Some(&remote.uri()));
    let (_, token) = app.user(Role::EirsAgent);
    let vehicle = app.vehicle("VA-2", None);

    Mock::given(method("POST"))
        .and(path("/vehicle/create-virtual-account"))
        .and(header("api-secret", common::REMOTE_SECRET))
        .and(header(
            "authorization",
            format!("Bearer {}", common::UPSTREAM_TOKEN).as_str(),
        ))
        .and(body_json(json!({"vehicleId": vehicle.id, "walletId": "w-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"accountNumber": "0123456789", "bank": "Levy MFB"}
        })))
        .expect(1)
        .mount(&remote)
        .await;

    let res = app
        .server
        .post("/vehicles/virtual-account")
        .authorization_bearer(token)
        .json(&json!({"vehicleId": vehicle.id, "walletId": "w-1"}))
        .await;
    res.assert_status(StatusCode::CREATED);
    let body = res.json::<Value>();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["accountNumber"], "0123456789");
}

#[tokio::test]
async fn upstream_status_passes_through() {
    let remote = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vehicle/attach-sticker"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"message": "sticker already used"})),
        )
        .mount(&remote)
        .await;

    let app = common::app_with_remote(Some(&remote.uri()));
    let (_, token) = app.user(Role::EirsAgent);
    let vehicle = app.vehicle("ST-1", None);

    let res = app
        .server
        .post("/stickers/attach")
        .authorization_bearer(token)
        .json(&json!({"vehicleId": vehicle.id, "stickerCode": "S-1"}))
        .await;
    res.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let error = &res.json::<Value>()["error"];
    assert_eq!(error["kind"], "upstream");
    assert_eq!(error["message"], "sticker already used");
}

#[tokio::test]
async fn unconfigured_remote_is_503() {
    let app = common::app();
    let (_, token) = app.user(Role::Admin);
    let vehicle = app.vehicle("NT-1", None);

    let res = app
        .server
        .post(&format!("/vehicles/{}/net-total", vehicle.id))
        .authorization_bearer(token)
        .await;
    res.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.json::<Value>()["error"]["kind"], "unavailable");
}

#[tokio::test]
async fn identity_lookup_answers_profile_or_404() {
    let app = common::app();
    let (_, token) = app.user(Role::LgaAgent);

    let res = app
        .server
        .get("/identity/12345678901")
        .authorization_bearer(&token)
        .await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["data"]["firstName"], "Ada");

    app.server
        .get("/identity/00000000000")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
