//! E2E tests for admin account management

mod common;

use common::TestServer;
use medialodge::data::UserRole;

#[tokio::test]
async fn test_admin_endpoints_are_role_gated() {
    let server = TestServer::new().await;
    let viewer = server.seed_user("viewer@test.example.com", UserRole::Viewer).await;
    let uploader = server.seed_user("up@test.example.com", UserRole::Uploader).await;

    for user in [&viewer, &uploader] {
        let response = server
            .client
            .get(server.url("/admin/users"))
            .header("Cookie", server.session_cookie(user))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 403);
    }

    let response = server
        .client
        .get(server.url("/admin/users"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 307);
}

#[tokio::test]
async fn test_initial_admin_is_provisioned_at_startup() {
    let server = TestServer::new().await;

    let root = server
        .state
        .db
        .get_user_by_email("root@test.example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(root.role, UserRole::Admin);
    assert!(root.active);
}

#[tokio::test]
async fn test_list_users_shows_all_accounts() {
    let server = TestServer::new().await;
    let admin = server.seed_user("admin@test.example.com", UserRole::Admin).await;
    server.seed_user("viewer@test.example.com", UserRole::Viewer).await;

    let response = server
        .client
        .get(server.url("/admin/users"))
        .header("Cookie", server.session_cookie(&admin))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let users: serde_json::Value = response.json().await.unwrap();
    let emails: Vec<&str> = users
        .as_array()
        .unwrap()
        .iter()
        .map(|user| user["email"].as_str().unwrap())
        .collect();
    // Startup admin plus the two seeded accounts.
    assert!(emails.contains(&"root@test.example.com"));
    assert!(emails.contains(&"admin@test.example.com"));
    assert!(emails.contains(&"viewer@test.example.com"));
}

#[tokio::test]
async fn test_add_user_provisions_and_reactivates() {
    let server = TestServer::new().await;
    let admin = server.seed_user("admin@test.example.com", UserRole::Admin).await;
    let cookie = server.session_cookie(&admin);

    let response = server
        .client
        .post(server.url("/admin/users"))
        .header("Cookie", &cookie)
        .form(&[
            ("email", "New@Test.Example.com"),
            ("name", "Newcomer"),
            ("role", "uploader"),
        ])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["created"], true);
    assert_eq!(body["user"]["email"], "new@test.example.com");
    assert_eq!(body["user"]["role"], "uploader");
    assert_eq!(body["user"]["active"], true);

    // Posting the same email again reactivates instead of duplicating.
    let user_id = body["user"]["id"].as_i64().unwrap();
    server.state.db.set_user_active(user_id, false).await.unwrap();

    let response = server
        .client
        .post(server.url("/admin/users"))
        .header("Cookie", &cookie)
        .form(&[("email", "new@test.example.com"), ("role", "uploader")])
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["created"], false);
    assert_eq!(body["user"]["active"], true);
}

#[tokio::test]
async fn test_add_user_validates_email_and_role() {
    let server = TestServer::new().await;
    let admin = server.seed_user("admin@test.example.com", UserRole::Admin).await;
    let cookie = server.session_cookie(&admin);

    let response = server
        .client
        .post(server.url("/admin/users"))
        .header("Cookie", &cookie)
        .form(&[("email", "   ")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = server
        .client
        .post(server.url("/admin/users"))
        .header("Cookie", &cookie)
        .form(&[("email", "x@test.example.com"), ("role", "superuser")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_change_role_updates_the_row() {
    let server = TestServer::new().await;
    let admin = server.seed_user("admin@test.example.com", UserRole::Admin).await;
    let target = server.seed_user("target@test.example.com", UserRole::Viewer).await;
    let cookie = server.session_cookie(&admin);

    let response = server
        .client
        .post(server.url(&format!("/admin/users/{}/role", target.id)))
        .header("Cookie", &cookie)
        .form(&[("role", "admin")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let updated = server
        .state
        .db
        .get_user_by_id(target.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.role, UserRole::Admin);

    // Unknown user id is a 404, unknown role a 400.
    let response = server
        .client
        .post(server.url("/admin/users/9999/role"))
        .header("Cookie", &cookie)
        .form(&[("role", "admin")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let response = server
        .client
        .post(server.url(&format!("/admin/users/{}/role", target.id)))
        .header("Cookie", &cookie)
        .form(&[("role", "owner")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_toggle_active_flag() {
    let server = TestServer::new().await;
    let admin = server.seed_user("admin@test.example.com", UserRole::Admin).await;
    let target = server.seed_user("target@test.example.com", UserRole::Viewer).await;
    let cookie = server.session_cookie(&admin);

    let response = server
        .client
        .post(server.url(&format!("/admin/users/{}/active", target.id)))
        .header("Cookie", &cookie)
        .form(&[("active", "false")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let updated = server
        .state
        .db
        .get_user_by_id(target.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!updated.active);

    let response = server
        .client
        .post(server.url(&format!("/admin/users/{}/active", target.id)))
        .header("Cookie", &cookie)
        .form(&[("active", "True")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let updated = server
        .state
        .db
        .get_user_by_id(target.id)
        .await
        .unwrap()
        .unwrap();
    assert!(updated.active);
}
