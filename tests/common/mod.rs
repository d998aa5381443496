#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use bookly::auth::{
    AuthGate, CredentialHasher, InMemoryRevocationStore, Role, RevocationStore, SessionService,
    TokenCodec,
};
use bookly::books::InMemoryBookRepository;
use bookly::configuration::JwtSettings;
use bookly::startup::{run, API_PREFIX};
use bookly::users::{InMemoryUserRepository, NewUser, UserRepository};
use serde_json::{json, Value};

pub const TEST_PASSWORD: &str = "SecurePass123";

pub struct TestApp {
    pub address: String,
    pub users: Arc<dyn UserRepository>,
    pub revocations: Arc<dyn RevocationStore>,
    pub codec: Arc<TokenCodec>,
    pub client: reqwest::Client,
}

pub fn test_jwt_settings() -> JwtSettings {
    JwtSettings {
        secret: "integration-test-secret-0123456789abcdef".to_string(),
        algorithm: "HS256".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604800,
        issuer: "auth-service".to_string(),
    }
}

pub async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}{}", port, API_PREFIX);

    let codec = Arc::new(TokenCodec::from_settings(&test_jwt_settings()).expect("Invalid JWT settings"));
    let users: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());
    let revocations: Arc<dyn RevocationStore> = Arc::new(InMemoryRevocationStore::for_codec(&codec));

    let session = SessionService::new(
        users.clone(),
        codec.clone(),
        revocations.clone(),
        CredentialHasher::new(4),
    )
    .expect("Failed to build session service");
    let gate = AuthGate::new(codec.clone(), revocations.clone());

    let server = run(listener, session, gate, Arc::new(InMemoryBookRepository::new()))
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        users,
        revocations,
        codec,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn root(&self) -> String {
        self.address.trim_end_matches(API_PREFIX).to_string()
    }

    pub async fn signup(&self, username: &str, email: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/auth/signup", self.address))
            .json(&json!({
                "username": username,
                "email": email,
                "first_name": "Jane",
                "last_name": "Doe",
                "password": TEST_PASSWORD
            }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/auth/login", self.address))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(&format!("{}{}", self.address, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Signs up and logs in; returns (access_token, refresh_token).
    pub async fn signed_in_user(&self, username: &str, email: &str) -> (String, String) {
        assert_eq!(201, self.signup(username, email).await.status().as_u16());
        let response = self.login(email, TEST_PASSWORD).await;
        assert_eq!(200, response.status().as_u16());

        let refresh = refresh_cookie(&response).expect("Login did not set a refresh cookie");
        let body: Value = response.json().await.expect("Failed to parse response");
        let access = body["access_token"].as_str().unwrap().to_string();
        (access, refresh)
    }

    /// Inserts an admin account directly and logs it in.
    pub async fn signed_in_admin(&self) -> (String, String) {
        let email = "admin@example.com";
        self.users
            .insert(NewUser {
                username: "admin".to_string(),
                email: email.to_string(),
                first_name: "Ada".to_string(),
                last_name: "Admin".to_string(),
                password_hash: CredentialHasher::new(4).hash(TEST_PASSWORD).unwrap(),
                role: Role::Admin,
            })
            .await
            .expect("Failed to insert admin");

        let response = self.login(email, TEST_PASSWORD).await;
        assert_eq!(200, response.status().as_u16());
        let refresh = refresh_cookie(&response).expect("Login did not set a refresh cookie");
        let body: Value = response.json().await.expect("Failed to parse response");
        (body["access_token"].as_str().unwrap().to_string(), refresh)
    }
}

/// Raw `Set-Cookie` header for the refresh token, if present.
pub fn refresh_cookie_header(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("refresh_token="))
        .map(str::to_string)
}

pub fn refresh_cookie(response: &reqwest::Response) -> Option<String> {
    let header = refresh_cookie_header(response)?;
    let value = header.trim_start_matches("refresh_token=");
    Some(value.split(';').next().unwrap_or_default().to_string())
}

pub async fn error_code(response: reqwest::Response) -> String {
    let body: Value = response.json().await.expect("Failed to parse error body");
    body["code"].as_str().unwrap_or_default().to_string()
}
