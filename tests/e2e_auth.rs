//! E2E tests for the sign-in flow and session lifecycle

mod common;

use common::{TestServer, extract_cookie};
use medialodge::data::UserRole;

#[tokio::test]
async fn test_login_sets_csrf_cookie_and_redirects_to_provider() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/auth/login"))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header");
    assert!(location.starts_with("https://provider.test/authorize?"));
    assert!(location.contains("client_id=test-client-id"));
    assert!(location.contains("response_type=code"));
    assert!(location.contains("scope=openid+email+profile"));
    assert!(location.contains("state="));

    let state = extract_cookie(&response, "oauth_state").expect("oauth_state cookie");
    assert!(!state.is_empty());
}

#[tokio::test]
async fn test_callback_rejects_missing_csrf_cookie() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/auth/callback?code=dummy&state=dummy"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_callback_rejects_state_mismatch() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/auth/callback?code=dummy&state=other"))
        .header("Cookie", "oauth_state=expected")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_callback_redirects_to_auth_required_on_exchange_failure() {
    let server = TestServer::new().await;

    // The test token endpoint is unroutable, so the exchange fails.
    let response = server
        .client
        .get(server.url("/auth/callback?code=dummy&state=tok"))
        .header("Cookie", "oauth_state=tok")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert_eq!(location, "/auth-required");
    // Session cookie is cleared on the way out.
    assert_eq!(extract_cookie(&response, "session").as_deref(), Some(""));
}

#[tokio::test]
async fn test_logout_clears_session_cookie() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/auth/logout"))
        .header("Cookie", "session=dummy")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(extract_cookie(&response, "session").as_deref(), Some(""));
}

#[tokio::test]
async fn test_auth_status_reflects_session() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/auth/status"))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["authenticated"], false);

    let user = server.seed_user("user@test.example.com", UserRole::Viewer).await;
    let response = server
        .client
        .get(server.url("/auth/status"))
        .header("Cookie", server.session_cookie(&user))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["user"]["email"], "user@test.example.com");
    assert_eq!(body["user"]["role"], "viewer");
}

#[tokio::test]
async fn test_home_without_session_redirects_to_auth_required() {
    let server = TestServer::new().await;

    let response = server.client.get(server.url("/")).send().await.unwrap();

    assert_eq!(response.status(), 307);
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert_eq!(location, "/auth-required");
}

#[tokio::test]
async fn test_garbage_session_token_is_treated_as_unauthenticated() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/"))
        .header("Cookie", "session=not-a-real-token")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 307);
}

#[tokio::test]
async fn test_deactivated_account_is_evicted_at_resync() {
    let server = TestServer::new().await;

    let user = server.seed_user("gone@test.example.com", UserRole::Viewer).await;
    let cookie = server.session_cookie(&user);

    server.state.db.set_user_active(user.id, false).await.unwrap();

    let response = server
        .client
        .get(server.url("/"))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert_eq!(location, "/auth/unauthorized");
    assert_eq!(extract_cookie(&response, "session").as_deref(), Some(""));

    // The unauthorized page surfaces the stashed email.
    let stashed = extract_cookie(&response, "unauthorized_email").expect("stashed email");
    let response = server
        .client
        .get(server.url("/auth/unauthorized"))
        .header("Cookie", format!("unauthorized_email={stashed}"))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["email"], "gone@test.example.com");
}

#[tokio::test]
async fn test_role_change_takes_effect_only_after_home_resync() {
    let server = TestServer::new().await;

    let user = server.seed_user("promoted@test.example.com", UserRole::Viewer).await;
    let stale_cookie = server.session_cookie(&user);

    // Snapshot says viewer: admin endpoints are forbidden.
    let response = server
        .client
        .get(server.url("/admin/users"))
        .header("Cookie", &stale_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    server
        .state
        .db
        .update_user_role(user.id, UserRole::Admin)
        .await
        .unwrap();

    // Still forbidden on the stale snapshot.
    let response = server
        .client
        .get(server.url("/admin/users"))
        .header("Cookie", &stale_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // The home page re-sync rewrites the snapshot...
    let response = server
        .client
        .get(server.url("/"))
        .header("Cookie", &stale_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let refreshed = extract_cookie(&response, "session").expect("refreshed session cookie");

    // ...and the new snapshot carries the admin role.
    let response = server
        .client
        .get(server.url("/admin/users"))
        .header("Cookie", format!("session={refreshed}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}
