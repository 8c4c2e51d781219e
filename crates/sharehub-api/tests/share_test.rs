//! Integration tests for share management and the public share endpoints.

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use sharehub_database::ShareStore;

use common::{PUBLIC_URL, TestApp, id_of};

#[tokio::test]
async fn test_create_share_returns_public_url() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice");
    let file_id = app.upload_owned(&alice, None, "a.txt", b"a").await;

    let share = app.create_share(&alice, "file", file_id, "read", None).await;
    let token = share["token"].as_str().unwrap();

    assert_eq!(
        share["url"].as_str().unwrap(),
        format!("{PUBLIC_URL}/api/public/share/{token}")
    );
    assert_eq!(share["permission_type"], "read");
    assert_eq!(share["has_password"], false);
    assert_eq!(share["access_count"], 0);
}

#[tokio::test]
async fn test_cannot_share_someone_elses_file() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice");
    let (_, bob) = app.create_user("bob");
    let file_id = app.upload_owned(&alice, None, "a.txt", b"a").await;

    let resp = app
        .request(
            Method::POST,
            "/api/shares",
            Some(json!({
                "resource_type": "file",
                "resource_id": file_id,
                "permission_type": "read",
            })),
            Some(&bob),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_permission_type_is_a_validation_error() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice");
    let file_id = app.upload_owned(&alice, None, "a.txt", b"a").await;

    let resp = app
        .request(
            Method::POST,
            "/api/shares",
            Some(json!({
                "resource_type": "file",
                "resource_id": file_id,
                "permission_type": "admin",
            })),
            Some(&alice),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_and_revoke_shares() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice");
    let file_id = app.upload_owned(&alice, None, "a.txt", b"a").await;
    let dir_id = app.create_directory(&alice, None, "docs").await;
    app.create_share(&alice, "file", file_id, "read", None).await;
    let dir_share = app
        .create_share(&alice, "directory", dir_id, "read_upload", None)
        .await;

    let all = app
        .request(Method::GET, "/api/shares", None, Some(&alice))
        .await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.json()["data"]["total_items"], 2);

    let dirs = app
        .request(
            Method::GET,
            "/api/shares?resource_type=directory",
            None,
            Some(&alice),
        )
        .await;
    assert_eq!(dirs.json()["data"]["items"].as_array().unwrap().len(), 1);

    let share_id = dir_share["id"].as_str().unwrap();
    let revoked = app
        .request(
            Method::DELETE,
            &format!("/api/shares/{share_id}"),
            None,
            Some(&alice),
        )
        .await;
    assert_eq!(revoked.status, StatusCode::OK);

    let again = app
        .request(
            Method::DELETE,
            &format!("/api/shares/{share_id}"),
            None,
            Some(&alice),
        )
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);

    let token = dir_share["token"].as_str().unwrap();
    let public = app
        .request(Method::GET, &format!("/api/public/share/{token}"), None, None)
        .await;
    assert_eq!(public.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_other_users_cannot_see_a_share() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice");
    let (_, bob) = app.create_user("bob");
    let file_id = app.upload_owned(&alice, None, "a.txt", b"a").await;
    let share = app.create_share(&alice, "file", file_id, "read", None).await;
    let share_id = share["id"].as_str().unwrap();

    let resp = app
        .request(
            Method::GET,
            &format!("/api/shares/{share_id}"),
            None,
            Some(&bob),
        )
        .await;
    assert!(matches!(
        resp.status,
        StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
    ));
}

#[tokio::test]
async fn test_update_expiration_rejects_past_dates() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice");
    let file_id = app.upload_owned(&alice, None, "a.txt", b"a").await;
    let share = app.create_share(&alice, "file", file_id, "read", None).await;
    let share_id = share["id"].as_str().unwrap();

    let past = app
        .request(
            Method::PATCH,
            &format!("/api/shares/{share_id}"),
            Some(json!({ "expires_at": Utc::now() - Duration::hours(1) })),
            Some(&alice),
        )
        .await;
    assert_eq!(past.status, StatusCode::BAD_REQUEST);

    let future = Utc::now() + Duration::days(7);
    let ok = app
        .request(
            Method::PATCH,
            &format!("/api/shares/{share_id}"),
            Some(json!({ "expires_at": future })),
            Some(&alice),
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK);
    assert!(ok.json()["data"]["expires_at"].is_string());
}

#[tokio::test]
async fn test_expired_share_is_rejected() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice");
    let file_id = app.upload_owned(&alice, None, "a.txt", b"a").await;
    let share = app.create_share(&alice, "file", file_id, "read", None).await;
    let share_id: Uuid = share["id"].as_str().unwrap().parse().unwrap();
    let token = share["token"].as_str().unwrap();

    app.state
        .stores
        .shares
        .update_expiration(share_id, Some(Utc::now() - Duration::minutes(1)))
        .await
        .unwrap();

    let resp = app
        .request(
            Method::GET,
            &format!("/api/files/{file_id}/download?share_token={token}"),
            None,
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert!(resp.json()["message"].as_str().unwrap().contains("expired"));
}

#[tokio::test]
async fn test_password_protected_share() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice");
    let file_id = app.upload_owned(&alice, None, "a.txt", b"abc").await;
    let share = app
        .create_share(&alice, "file", file_id, "read", Some("hunter22"))
        .await;
    let token = share["token"].as_str().unwrap();
    assert_eq!(share["has_password"], true);

    let missing = app
        .request(Method::GET, &format!("/api/public/share/{token}"), None, None)
        .await;
    assert_eq!(missing.status, StatusCode::FORBIDDEN);
    assert_eq!(missing.json()["details"]["requires_password"], true);

    let wrong = app
        .request(
            Method::POST,
            &format!("/api/public/share/{token}/validate"),
            Some(json!({ "password": "nope" })),
            None,
        )
        .await;
    assert_eq!(wrong.status, StatusCode::FORBIDDEN);

    let right = app
        .request(
            Method::POST,
            &format!("/api/public/share/{token}/validate"),
            Some(json!({ "password": "hunter22" })),
            None,
        )
        .await;
    assert_eq!(right.status, StatusCode::OK);
    assert_eq!(right.json()["data"]["resource_id"], file_id.to_string());
    assert!(right.json()["data"].get("owner_id").is_none());

    let info = app
        .request(
            Method::GET,
            &format!("/api/public/share/{token}?password=hunter22"),
            None,
            None,
        )
        .await;
    assert_eq!(info.status, StatusCode::OK);
    assert_eq!(info.json()["data"]["resource_name"], "a.txt");
    assert_eq!(info.json()["data"]["size_bytes"], 3);
    assert_eq!(info.json()["data"]["has_password"], true);
}

#[tokio::test]
async fn test_access_log_records_views_and_downloads() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice");
    let file_id = app.upload_owned(&alice, None, "a.txt", b"abc").await;
    let share = app.create_share(&alice, "file", file_id, "read", None).await;
    let token = share["token"].as_str().unwrap();
    let share_id = id_of(&json!({ "data": share }));

    app.request(Method::GET, &format!("/api/public/share/{token}"), None, None)
        .await;
    let download = app
        .request(
            Method::GET,
            &format!("/api/files/{file_id}/download?stream=true&share_token={token}"),
            None,
            None,
        )
        .await;
    assert_eq!(download.status, StatusCode::OK);

    let log = app
        .request(
            Method::GET,
            &format!("/api/shares/{share_id}/access-log"),
            None,
            Some(&alice),
        )
        .await;
    assert_eq!(log.status, StatusCode::OK);
    let entries = log.json()["data"].as_array().unwrap().clone();
    assert_eq!(entries.len(), 2);
    let actions: Vec<&str> = entries
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"view"));
    assert!(actions.contains(&"download"));

    let fetched = app
        .request(
            Method::GET,
            &format!("/api/shares/{share_id}"),
            None,
            Some(&alice),
        )
        .await;
    assert_eq!(fetched.json()["data"]["access_count"], 1);
}

#[tokio::test]
async fn test_only_the_owner_can_revoke() {
    let app = TestApp::new().await;
    let (_, alice) = app.create_user("alice");
    let (_, bob) = app.create_user("bob");
    let file_id = app.upload_owned(&alice, None, "a.txt", b"a").await;
    let share = app.create_share(&alice, "file", file_id, "read", None).await;
    let share_id = share["id"].as_str().unwrap();

    let resp = app
        .request(
            Method::DELETE,
            &format!("/api/shares/{share_id}"),
            None,
            Some(&bob),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let token = share["token"].as_str().unwrap();
    let still_there = app
        .request(Method::GET, &format!("/api/public/share/{token}"), None, None)
        .await;
    assert_eq!(still_there.status, StatusCode::OK);
}
