/// Session orchestration
///
/// Signup, login, refresh and logout on top of the hasher, the token codec,
/// the revocation store and the user repository, all injected.
///
/// Logout revokes only the presented access token. The refresh token issued
/// alongside it stays usable until it expires.
///
/// A login for an unknown email still runs one bcrypt verification, against
/// a placeholder digest hashed at the configured cost.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use crate::auth::claims::{Claims, Role};
use crate::auth::jwt::TokenCodec;
use crate::auth::password::{validate_password_strength, CredentialHasher};
use crate::auth::revocation::RevocationStore;
use crate::error::{AppError, AuthError};
use crate::users::{NewUser, UserRepository, UserView};
use crate::validators::{is_valid_email, is_valid_name, is_valid_username};

/// Signup request
#[derive(Debug, Clone, Deserialize)]
pub struct SignupData {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Tokens and account returned by a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserView,
    pub role: Role,
}

#[derive(Clone)]
pub struct SessionService {
    users: Arc<dyn UserRepository>,
    codec: Arc<TokenCodec>,
    revocations: Arc<dyn RevocationStore>,
    hasher: CredentialHasher,
    placeholder_digest: Arc<str>,
}

const PLACEHOLDER_PASSWORD: &str = "placeholder-password-never-issued";

impl SessionService {
    /// # Errors
    /// Returns error if the placeholder digest cannot be hashed (invalid cost)
    pub fn new(
        users: Arc<dyn UserRepository>,
        codec: Arc<TokenCodec>,
        revocations: Arc<dyn RevocationStore>,
        hasher: CredentialHasher,
    ) -> Result<Self, AppError> {
        let placeholder_digest = hasher.hash(PLACEHOLDER_PASSWORD)?.into();

        Ok(Self {
            users,
            codec,
            revocations,
            hasher,
            placeholder_digest,
        })
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Create an account with role `user`.
    ///
    /// # Errors
    /// - Validation errors for malformed fields or a weak password
    /// - `AlreadyExists` when the email is already registered
    pub async fn register(&self, signup: SignupData) -> Result<UserView, AppError> {
        let email = is_valid_email(&signup.email)?;
        let username = is_valid_username(&signup.username)?;
        let first_name = is_valid_name("first_name", &signup.first_name)?;
        let last_name = is_valid_name("last_name", &signup.last_name)?;
        validate_password_strength(&signup.password)?;

        if self.users.find_by_email(&email).await?.is_some() {
            tracing::warn!(email = %email, "Signup for existing email rejected");
            return Err(AuthError::AlreadyExists.into());
        }

        let password_hash = self.hasher.hash_blocking(signup.password).await?;

        let user = self
            .users
            .insert(NewUser {
                username,
                email,
                first_name,
                last_name,
                password_hash,
                role: Role::User,
            })
            .await?;

        tracing::info!(user_id = %user.uid, "User registered");
        Ok(UserView::from(&user))
    }

    /// # Errors
    /// `InvalidCredentials` for an unknown email and for a wrong password alike
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let email = email.trim();

        let Some(user) = self.users.find_by_email(email).await? else {
            self.hasher
                .verify_blocking(password.to_string(), self.placeholder_digest.to_string())
                .await?;
            tracing::debug!("Login for unknown email");
            return Err(AuthError::InvalidCredentials.into());
        };

        let password_valid = self
            .hasher
            .verify_blocking(password.to_string(), user.password_hash.clone())
            .await?;
        if !password_valid {
            tracing::debug!(user_id = %user.uid, "Login with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        let subject = user.uid.to_string();
        let access_token = self.codec.access_token(&subject, user.role)?;
        let refresh_token = self.codec.refresh_token(&subject)?;

        tracing::info!(user_id = %user.uid, "User logged in");
        Ok(LoginOutcome {
            access_token,
            refresh_token,
            user: UserView::from(&user),
            role: user.role,
        })
    }

    /// Mint a new access token from gate-validated refresh claims.
    ///
    /// # Errors
    /// - `Expired` if the refresh token's `exp` has passed
    /// - `InvalidToken` if the subject no longer names an account
    pub async fn refresh(&self, claims: &Claims) -> Result<String, AppError> {
        if claims.is_expired_at(Utc::now()) {
            return Err(AuthError::Expired.into());
        }

        let user = self
            .users
            .find_by_id(claims.user_id()?)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let access_token = self.codec.access_token(&claims.sub, user.role)?;
        tracing::info!(user_id = %claims.sub, "Access token refreshed");
        Ok(access_token)
    }

    /// Revoke the presented access token.
    pub async fn logout(&self, claims: &Claims) -> Result<(), AppError> {
        self.revocations.revoke(&claims.jti).await.map_err(|e| {
            tracing::error!(jti = %claims.jti, error = %e, "Failed to revoke token");
            AuthError::StoreUnavailable
        })?;

        tracing::info!(user_id = %claims.sub, jti = %claims.jti, "User logged out");
        Ok(())
    }

    /// Account named by the token subject.
    pub async fn current_user(&self, claims: &Claims) -> Result<UserView, AppError> {
        let user = self
            .users
            .find_by_id(claims.user_id()?)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        Ok(UserView::from(&user))
    }

    pub async fn all_users(&self) -> Result<Vec<UserView>, AppError> {
        Ok(self.users.list().await?.iter().map(UserView::from).collect())
    }
}
