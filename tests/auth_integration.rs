mod common;

use common::{error_code, refresh_cookie_header, spawn_app, TEST_PASSWORD};
use serde_json::{json, Value};

// --- Signup ---

#[tokio::test]
async fn signup_returns_201_without_password_hash() {
    let app = spawn_app().await;

    let response = app.signup("jane", "jane@example.com").await;
    assert_eq!(201, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["email"], "jane@example.com");
    assert_eq!(body["role"], "user");
    assert_eq!(body["is_verified"], false);
    assert!(body.get("password_hash").is_none());
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn signup_with_existing_email_returns_403() {
    let app = spawn_app().await;
    app.signup("jane", "jane@example.com").await;

    let response = app.signup("jane2", "jane@example.com").await;

    assert_eq!(403, response.status().as_u16());
    assert_eq!(error_code(response).await, "ALREADY_EXISTS");
}

#[tokio::test]
async fn signup_with_taken_username_returns_409() {
    let app = spawn_app().await;
    app.signup("jane", "jane@example.com").await;

    let response = app.signup("jane", "other@example.com").await;

    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn signup_returns_400_for_invalid_data() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let test_cases = vec![
        (
            json!({"username": "jane", "email": "not-an-email", "first_name": "Jane", "last_name": "Doe", "password": TEST_PASSWORD}),
            "invalid email",
        ),
        (
            json!({"username": "jane", "email": "jane@example.com", "first_name": "Jane", "last_name": "Doe", "password": "short"}),
            "short password",
        ),
        (
            json!({"username": "jane", "email": "jane@example.com", "first_name": "Jane", "last_name": "Doe", "password": "p".repeat(73)}),
            "password over the bcrypt limit",
        ),
        (
            json!({"username": "j", "email": "jane@example.com", "first_name": "Jane", "last_name": "Doe", "password": TEST_PASSWORD}),
            "short username",
        ),
        (
            json!({"email": "jane@example.com", "password": TEST_PASSWORD}),
            "missing fields",
        ),
    ];

    for (body, description) in test_cases {
        let response = client
            .post(&format!("{}/auth/signup", &app.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            400,
            response.status().as_u16(),
            "Signup did not fail with 400 for {}",
            description
        );
    }
}

// --- Login ---

#[tokio::test]
async fn login_returns_access_token_and_refresh_cookie() {
    let app = spawn_app().await;
    app.signup("jane", "jane@example.com").await;

    let response = app.login("jane@example.com", TEST_PASSWORD).await;
    assert_eq!(200, response.status().as_u16());

    let cookie = refresh_cookie_header(&response).expect("Missing refresh cookie");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Secure"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Max-Age=604800"));

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["expires_in"], 900);
    assert_eq!(body["role"], "user");
    assert_eq!(body["user"]["email"], "jane@example.com");
    assert!(body.get("refresh_token").is_none());

    let claims = app
        .codec
        .decode(body["access_token"].as_str().unwrap())
        .expect("Access token should decode");
    assert_eq!(claims.token_type, bookly::auth::TokenType::Access);
    assert_eq!(claims.exp - claims.iat, 900);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app().await;
    app.signup("jane", "jane@example.com").await;

    let wrong_password = app.login("jane@example.com", "WrongPass123").await;
    let unknown_email = app.login("nobody@example.com", TEST_PASSWORD).await;

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_email.status().as_u16());

    let a: Value = wrong_password.json().await.unwrap();
    let b: Value = unknown_email.json().await.unwrap();
    assert_eq!(a["code"], b["code"]);
    assert_eq!(a["message"], b["message"]);
    assert_eq!(a["code"], "INVALID_CREDENTIALS");
}

// --- Gate ---

#[tokio::test]
async fn protected_route_without_token_returns_401() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(&format!("{}/auth/me", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "MISSING_TOKEN");
}

#[tokio::test]
async fn protected_route_with_garbage_token_returns_401() {
    let app = spawn_app().await;

    let response = app.get_with_token("/auth/me", "not.a.jwt").await;

    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "TOKEN_INVALID");
}

#[tokio::test]
async fn me_returns_the_current_user() {
    let app = spawn_app().await;
    let (access, _) = app.signed_in_user("jane", "jane@example.com").await;

    let response = app.get_with_token("/auth/me", &access).await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["username"], "jane");
}

#[tokio::test]
async fn refresh_token_is_rejected_on_access_routes() {
    let app = spawn_app().await;
    let (_, refresh) = app.signed_in_user("jane", "jane@example.com").await;

    let response = app.get_with_token("/auth/me", &refresh).await;

    assert_eq!(403, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "WRONG_TOKEN_TYPE");
    assert_eq!(body["message"], "Please provide a access token");
}

// --- Refresh ---

#[tokio::test]
async fn refresh_issues_a_new_access_token() {
    let app = spawn_app().await;
    let (_, refresh) = app.signed_in_user("jane", "jane@example.com").await;

    let response = app.get_with_token("/auth/refresh_token", &refresh).await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    let access = body["access_token"].as_str().unwrap();

    let me = app.get_with_token("/auth/me", access).await;
    assert_eq!(200, me.status().as_u16());
}

#[tokio::test]
async fn access_token_is_rejected_at_refresh() {
    let app = spawn_app().await;
    let (access, _) = app.signed_in_user("jane", "jane@example.com").await;

    let response = app.get_with_token("/auth/refresh_token", &access).await;

    assert_eq!(403, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Please provide a refresh token");
}

#[tokio::test]
async fn refreshed_token_keeps_admin_role() {
    let app = spawn_app().await;
    let (_, refresh) = app.signed_in_admin().await;

    let response = app.get_with_token("/auth/refresh_token", &refresh).await;
    let body: Value = response.json().await.unwrap();
    let access = body["access_token"].as_str().unwrap();

    let users = app.get_with_token("/auth/all_users", access).await;
    assert_eq!(200, users.status().as_u16());
}

// --- Logout ---

#[tokio::test]
async fn logout_revokes_the_access_token() {
    let app = spawn_app().await;
    let (access, _) = app.signed_in_user("jane", "jane@example.com").await;

    let response = app.get_with_token("/auth/logout", &access).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Logged Out Successfully");

    let reuse = app.get_with_token("/auth/me", &access).await;
    assert_eq!(403, reuse.status().as_u16());
    assert_eq!(error_code(reuse).await, "TOKEN_REVOKED");

    let jti = app.codec.decode(&access).unwrap().jti;
    assert!(app.revocations.is_revoked(&jti).await.unwrap());
}

#[tokio::test]
async fn refresh_token_survives_logout() {
    let app = spawn_app().await;
    let (access, refresh) = app.signed_in_user("jane", "jane@example.com").await;

    app.get_with_token("/auth/logout", &access).await;

    let response = app.get_with_token("/auth/refresh_token", &refresh).await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn logging_out_twice_is_rejected() {
    let app = spawn_app().await;
    let (access, _) = app.signed_in_user("jane", "jane@example.com").await;

    app.get_with_token("/auth/logout", &access).await;
    let second = app.get_with_token("/auth/logout", &access).await;

    assert_eq!(403, second.status().as_u16());
}

// --- Roles ---

#[tokio::test]
async fn all_users_is_forbidden_for_regular_users() {
    let app = spawn_app().await;
    let (access, _) = app.signed_in_user("jane", "jane@example.com").await;

    let response = app.get_with_token("/auth/all_users", &access).await;

    assert_eq!(403, response.status().as_u16());
    assert_eq!(error_code(response).await, "FORBIDDEN");
}

#[tokio::test]
async fn all_users_lists_accounts_for_admins() {
    let app = spawn_app().await;
    app.signup("jane", "jane@example.com").await;
    let (access, _) = app.signed_in_admin().await;

    let response = app.get_with_token("/auth/all_users", &access).await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    let users = body.as_array().expect("Expected a list");
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("password_hash").is_none()));
}
