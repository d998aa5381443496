/// Authentication Routes
///
/// Signup, login, access-token refresh, logout and account lookups.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{require_role, Claims, Role, SessionService, SignupData};
use crate::error::{AppError, ErrorContext};
use crate::users::UserView;

pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response body; the refresh token travels in a cookie
#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserView,
    pub role: Role,
}

#[derive(Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

#[derive(Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /api/v1/auth/signup
///
/// # Errors
/// - 400: Validation errors
/// - 403: Email already registered
/// - 409: Username already taken
pub async fn signup(
    form: web::Json<SignupData>,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_signup");

    let user = session.register(form.into_inner()).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.uid,
        "Signup completed"
    );

    Ok(HttpResponse::Created().json(user))
}

/// POST /api/v1/auth/login
///
/// Returns the access token in the body and sets the refresh token as an
/// `HttpOnly; Secure; SameSite=Strict` cookie.
///
/// # Errors
/// - 401: Invalid credentials (same response for unknown email and wrong password)
pub async fn login(
    form: web::Json<LoginRequest>,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let outcome = session.login(&form.email, &form.password).await?;
    let context = context.with_user_id(outcome.user.uid.to_string());

    let cookie = Cookie::build(REFRESH_TOKEN_COOKIE, outcome.refresh_token)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(CookieDuration::seconds(session.codec().refresh_lifetime().num_seconds()))
        .finish();

    tracing::info!(
        request_id = %context.request_id,
        user_id = ?context.user_id,
        "Login completed"
    );

    Ok(HttpResponse::Ok().cookie(cookie).json(LoginResponse {
        access_token: outcome.access_token,
        token_type: "bearer".to_string(),
        expires_in: session.codec().access_lifetime().num_seconds(),
        user: outcome.user,
        role: outcome.role,
    }))
}

/// GET /api/v1/auth/refresh_token
///
/// **Requires a refresh token** in the `Authorization` header.
///
/// # Errors
/// - 400: Token expired between gate and handler
pub async fn refresh_token(
    claims: web::ReqData<Claims>,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let access_token = session.refresh(&claims).await?;
    Ok(HttpResponse::Ok().json(AccessTokenResponse { access_token }))
}

/// GET /api/v1/auth/logout
///
/// Revokes the presented access token. The refresh token from the same
/// login is not revoked.
///
/// # Errors
/// - 503: Revocation store unavailable
pub async fn logout(
    claims: web::ReqData<Claims>,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    session.logout(&claims).await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Logged Out Successfully".to_string(),
    }))
}

/// GET /api/v1/auth/me
pub async fn get_current_user(
    claims: web::ReqData<Claims>,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let user = session.current_user(&claims).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// GET /api/v1/auth/all_users
///
/// Admin only.
pub async fn get_all_users(
    claims: web::ReqData<Claims>,
    session: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let current = session.current_user(&claims).await?;
    require_role(current.role, &[Role::Admin])?;

    let users = session.all_users().await?;
    Ok(HttpResponse::Ok().json(users))
}
