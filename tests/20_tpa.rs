mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn list_requires_admin() {
    let app = TestApp::new();
    app.seed_tpa("t1", "First").await;

    let anonymous = app.get("/api/tpas", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let user = app.get("/api/tpas", Some(&app.user_token("t1"))).await;
    assert_eq!(user.status, StatusCode::FORBIDDEN);
    assert_eq!(user.body["code"], "FORBIDDEN");

    let admin = app.get("/api/tpas", Some(&app.admin_token())).await;
    assert_eq!(admin.status, StatusCode::OK);
    assert_eq!(admin.body["data"][0]["id"], "t1");
}

#[tokio::test]
async fn invalid_token_is_unauthorized() {
    let app = TestApp::new();

    let res = app.get("/api/tpa", Some("not-a-jwt")).await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn user_sees_own_tpa_only() {
    let app = TestApp::new();
    app.seed_tpa("t1", "First").await;
    app.seed_tpa("t2", "Second").await;
    let token = app.user_token("t1");

    let own = app.get("/api/tpa", Some(&token)).await;
    assert_eq!(own.status, StatusCode::OK);
    assert_eq!(own.body["data"]["name"], "First");

    // Non-admins cannot redirect to another tenant
    let other = app.get("/api/tpa/t2", Some(&token)).await;
    assert_eq!(other.body["data"]["id"], "t1");

    let query = app.get("/api/tpa?tpaId=t2", Some(&token)).await;
    assert_eq!(query.body["data"]["id"], "t1");
}

#[tokio::test]
async fn admin_selects_tpa() {
    let app = TestApp::new();
    app.seed_tpa("t1", "First").await;
    app.seed_tpa("t2", "Second").await;
    let token = app.admin_token();

    assert_eq!(app.get("/api/tpa/t2", Some(&token)).await.body["data"]["name"], "Second");
    assert_eq!(app.get("/api/tpa?tpaId=t1", Some(&token)).await.body["data"]["name"], "First");
    assert_eq!(app.get("/api/tpa?id=t2", Some(&token)).await.body["data"]["name"], "Second");

    // An admin with no tenant attribute and no selection has nothing to act on
    assert_eq!(app.get("/api/tpa", Some(&token)).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_tpa_is_not_found() {
    let app = TestApp::new();

    let res = app.get("/api/tpa", Some(&app.user_token("ghost"))).await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["error"], "TPA not found");
}

#[tokio::test]
async fn admin_upserts_tpa() {
    let app = TestApp::new();
    let token = app.admin_token();

    let created = app
        .post("/api/tpas", Some(&token), json!({ "name": "New TPA", "region": "south" }))
        .await;
    assert_eq!(created.status, StatusCode::OK);
    let tpa_id = created.body["data"]["tpaId"].as_str().unwrap().to_string();
    assert!(tpa_id.starts_with("tpa_"));
    assert_eq!(created.body["data"]["tpa"]["brokers"], json!([]));

    let renamed = app
        .post("/api/tpas", Some(&token), json!({ "id": tpa_id, "name": "Renamed" }))
        .await;
    assert_eq!(renamed.body["data"]["tpa"]["name"], "Renamed");
    assert_eq!(renamed.body["data"]["tpa"]["region"], "south");

    let listed = app.get("/api/tpas", Some(&token)).await;
    assert_eq!(listed.body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn tpa_upsert_validation_and_permissions() {
    let app = TestApp::new();

    let missing = app.post("/api/tpas", Some(&app.admin_token()), json!({})).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["error"], "TPA name is required");

    let forbidden = app
        .post("/api/tpas", Some(&app.user_token("t1")), json!({ "name": "X" }))
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
}
