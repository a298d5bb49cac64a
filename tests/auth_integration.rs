mod common;

use common::{
    cookie_value, refresh_cookie, spawn_app, spawn_guarded_app, ADMIN_EMAIL, PASSWORD, USER_EMAIL,
};
use serde_json::{json, Value};

// --- Login Tests ---

#[tokio::test]
async fn login_returns_200_with_access_token_and_refresh_cookie() {
    let app = spawn_app().await;

    let response = app.post_login(USER_EMAIL, PASSWORD).await;
    assert_eq!(200, response.status().as_u16());

    let cookie = refresh_cookie(&response).expect("Refresh cookie missing");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/api/auth/refresh"));
    assert!(cookie.contains("Max-Age=1209600"));
    assert!(!cookie_value(&cookie).is_empty());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["accessToken"].as_str().is_some());
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["expiresIn"], 900);
    assert_eq!(body["user"]["id"], app.user_id.to_string());
    assert_eq!(body["user"]["email"], USER_EMAIL);
    assert_eq!(body["user"]["roles"], json!(["user"]));

    // The refresh token never appears in a body
    assert!(body.get("refreshToken").is_none());
    assert!(body.get("refresh_token").is_none());
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app().await;

    let wrong_password = app.post_login(USER_EMAIL, "WrongPass123").await;
    let unknown_email = app.post_login("nobody@example.com", PASSWORD).await;

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_email.status().as_u16());
    assert!(refresh_cookie(&wrong_password).is_none());

    let a: Value = wrong_password.json().await.unwrap();
    let b: Value = unknown_email.json().await.unwrap();
    assert_eq!(a["code"], "UNAUTHORIZED");
    assert_eq!(a["code"], b["code"]);
    assert_eq!(a["message"], b["message"]);
}

#[tokio::test]
async fn login_for_deactivated_account_returns_401() {
    let app = spawn_app().await;
    app.accounts.set_active(app.user_id, false).await;

    let response = app.post_login(USER_EMAIL, PASSWORD).await;
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn login_returns_400_for_invalid_payloads() {
    let app = spawn_app().await;
    let test_cases = vec![
        (json!({ "email": USER_EMAIL }), "missing password"),
        (json!({ "password": PASSWORD }), "missing email"),
        (json!({ "email": "not-an-email", "password": PASSWORD }), "malformed email"),
        (json!({ "email": USER_EMAIL, "password": "" }), "empty password"),
        (json!({}), "empty object"),
    ];

    for (body, description) in test_cases {
        let response = app
            .client
            .post(app.url("/api/auth/login"))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when the payload had {}.",
            description
        );
    }
}

// --- Refresh Tests ---

#[tokio::test]
async fn refresh_returns_new_access_token_for_same_account() {
    let app = spawn_app().await;
    let session = app.login(USER_EMAIL).await;

    let response = app.post_refresh(&session.refresh_token).await;
    assert_eq!(200, response.status().as_u16());
    // Not rotated
    assert!(refresh_cookie(&response).is_none());

    let body: Value = response.json().await.unwrap();
    let access_token = body["accessToken"].as_str().unwrap();
    assert_ne!(access_token, session.access_token);
    assert_eq!(body["user"]["id"], app.user_id.to_string());

    let me: Value = app
        .get_authed("/api/auth/me", access_token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(me["id"], app.user_id.to_string());
}

#[tokio::test]
async fn refresh_can_be_repeated_with_the_same_cookie() {
    let app = spawn_app().await;
    let session = app.login(USER_EMAIL).await;

    for _ in 0..3 {
        let response = app.post_refresh(&session.refresh_token).await;
        assert_eq!(200, response.status().as_u16());
    }
}

#[tokio::test]
async fn refresh_without_cookie_returns_401() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/auth/refresh"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_rejects_garbage_and_access_tokens() {
    let app = spawn_app().await;
    let session = app.login(USER_EMAIL).await;

    for token in ["garbage", "a.b.c", session.access_token.as_str()] {
        let response = app.post_refresh(token).await;
        assert_eq!(
            401,
            response.status().as_u16(),
            "Refresh accepted token: {}",
            token
        );
    }
}

#[tokio::test]
async fn second_login_invalidates_first_refresh_token() {
    let app = spawn_app().await;

    let first = app.login(USER_EMAIL).await;
    let second = app.login(USER_EMAIL).await;

    assert_eq!(401, app.post_refresh(&first.refresh_token).await.status().as_u16());
    assert_eq!(200, app.post_refresh(&second.refresh_token).await.status().as_u16());
}

#[tokio::test]
async fn refresh_for_deactivated_account_returns_401() {
    let app = spawn_app().await;
    let session = app.login(USER_EMAIL).await;

    app.accounts.set_active(app.user_id, false).await;

    assert_eq!(401, app.post_refresh(&session.refresh_token).await.status().as_u16());
}

// --- Logout Tests ---

#[tokio::test]
async fn logout_revokes_refresh_token_and_clears_cookie() {
    let app = spawn_app().await;
    let session = app.login(USER_EMAIL).await;

    let response = app.post_logout(&session.access_token).await;
    assert_eq!(200, response.status().as_u16());

    let cleared = refresh_cookie(&response).expect("Logout did not clear the cookie");
    assert!(cleared.contains("Max-Age=0"));
    assert!(cookie_value(&cleared).is_empty());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "ok": true }));

    assert_eq!(401, app.post_refresh(&session.refresh_token).await.status().as_u16());
}

#[tokio::test]
async fn access_token_survives_logout_until_expiry() {
    let app = spawn_app().await;
    let session = app.login(USER_EMAIL).await;

    app.post_logout(&session.access_token).await;

    let response = app.get_authed("/api/auth/me", &session.access_token).await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn logout_requires_access_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/api/auth/logout"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn login_after_logout_starts_new_session() {
    let app = spawn_app().await;

    let first = app.login(USER_EMAIL).await;
    app.post_logout(&first.access_token).await;
    let second = app.login(USER_EMAIL).await;

    assert_eq!(401, app.post_refresh(&first.refresh_token).await.status().as_u16());
    assert_eq!(200, app.post_refresh(&second.refresh_token).await.status().as_u16());
}

// --- Identity and Roles ---

#[tokio::test]
async fn me_returns_identity_from_token() {
    let app = spawn_app().await;
    let session = app.login(ADMIN_EMAIL).await;

    let response = app.get_authed("/api/auth/me", &session.access_token).await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "id": app.admin_id.to_string(), "roles": ["admin"] }));
}

#[tokio::test]
async fn admin_ping_requires_admin_role() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN_EMAIL).await;
    let user = app.login(USER_EMAIL).await;

    let response = app.get_authed("/api/admin/ping", &admin.access_token).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["message"], "pong (admin)");

    let response = app.get_authed("/api/admin/ping", &user.access_token).await;
    assert_eq!(403, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn protected_routes_reject_missing_and_invalid_tokens() {
    let app = spawn_guarded_app().await;
    let session = app.login(USER_EMAIL).await;

    let headers = vec![
        (None, "no header"),
        (Some("Bearer".to_string()), "empty bearer"),
        (Some("Bearer invalid.token.here".to_string()), "garbage token"),
        (Some(format!("Basic {}", session.access_token)), "wrong scheme"),
        (Some(format!("Bearer {}", session.refresh_token)), "refresh token as access token"),
    ];

    for path in ["/api/auth/me", "/api/admin/ping", "/api/expenses"] {
        for (header, description) in &headers {
            let mut request = app.client.get(app.url(path));
            if let Some(value) = header {
                request = request.header("Authorization", value);
            }
            let response = request.send().await.expect("Failed to execute request.");

            assert_eq!(
                401,
                response.status().as_u16(),
                "{} accepted a request with {}",
                path,
                description
            );

            let body: Value = response.json().await.unwrap();
            assert_eq!(body["code"], "UNAUTHORIZED");
        }
    }
}
