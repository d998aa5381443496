/// Application Error Handling
///
/// One error type per concern, all folded into [`AppError`], which renders the
/// JSON error envelope for actix-web.
///
/// Authentication failures are reported with deliberately coarse kinds:
/// an expired token and a forged one are both `InvalidToken`, an unknown
/// email and a wrong password are both `InvalidCredentials`. Finer detail goes
/// to the logs only.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

use crate::auth::TokenType;

// ============================================================================
// DOMAIN-SPECIFIC ERROR TYPES
// ============================================================================

/// Validation errors for input data
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is empty")]
    EmptyField(String),
    #[error("{0} is too short (minimum {1} characters)")]
    TooShort(String, usize),
    #[error("{0} is too long (maximum {1} characters)")]
    TooLong(String, usize),
    #[error("{0} has invalid format")]
    InvalidFormat(String),
    #[error("{0} contains suspicious content")]
    SuspiciousContent(String),
    #[error("{0} must not be negative")]
    Negative(String),
}

/// Database operation errors
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Duplicate entry: {0}")]
    UniqueConstraintViolation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Database connection error: {0}")]
    ConnectionPool(String),
    #[error("Database error: {0}")]
    UnexpectedError(String),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required config: {0}")]
    MissingRequired(String),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// Authentication and authorization errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization token is missing")]
    MissingToken,
    /// Bad signature, malformed structure, missing claims or expiry.
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Token is missing JTI claim")]
    MalformedToken,
    #[error("Token has been revoked")]
    RevokedToken,
    #[error("Expected a {0} token")]
    WrongTokenType(TokenType),
    /// Unknown email or wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("User with email already exists")]
    AlreadyExists,
    #[error("Token has expired")]
    Expired,
    #[error("Role not permitted for this action")]
    Forbidden,
    #[error("Revocation store unavailable")]
    StoreUnavailable,
}

// ============================================================================
// UNIFIED APPLICATION ERROR TYPE
// ============================================================================

/// Central error type that all application errors map to
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => {
                AppError::Database(DatabaseError::NotFound("Record not found".to_string()))
            }
            // 23505: unique_violation
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                AppError::Database(DatabaseError::UniqueConstraintViolation(
                    db.constraint().unwrap_or("unique constraint").to_string(),
                ))
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::Database(DatabaseError::ConnectionPool(err.to_string()))
            }
            _ => AppError::Database(DatabaseError::UnexpectedError(err.to_string())),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Blocking task failed: {}", err))
    }
}

// ============================================================================
// HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message, safe to show to unauthenticated callers
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl AppError {
    /// Status, client code and external message.
    fn classify(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),

            AppError::Database(e) => match e {
                DatabaseError::UniqueConstraintViolation(_) => {
                    (StatusCode::CONFLICT, "DUPLICATE_ENTRY", "Duplicate entry".to_string())
                }
                DatabaseError::NotFound(what) => (StatusCode::NOT_FOUND, "NOT_FOUND", what.clone()),
                DatabaseError::ConnectionPool(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service temporarily unavailable".to_string(),
                ),
                DatabaseError::UnexpectedError(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error occurred".to_string(),
                ),
            },

            AppError::Auth(e) => match e {
                AuthError::MissingToken => (
                    StatusCode::UNAUTHORIZED,
                    "MISSING_TOKEN",
                    "Authorization token is missing".to_string(),
                ),
                AuthError::InvalidToken => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_INVALID",
                    "Invalid or expired token".to_string(),
                ),
                AuthError::MalformedToken => (
                    StatusCode::BAD_REQUEST,
                    "TOKEN_MALFORMED",
                    "Token is missing JTI claim".to_string(),
                ),
                AuthError::RevokedToken => (
                    StatusCode::FORBIDDEN,
                    "TOKEN_REVOKED",
                    "This token is invalid or has been revoked".to_string(),
                ),
                AuthError::WrongTokenType(required) => (
                    StatusCode::FORBIDDEN,
                    "WRONG_TOKEN_TYPE",
                    format!("Please provide a {} token", required),
                ),
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS",
                    "Invalid email or password".to_string(),
                ),
                AuthError::AlreadyExists => (
                    StatusCode::FORBIDDEN,
                    "ALREADY_EXISTS",
                    "User with email already exists".to_string(),
                ),
                AuthError::Expired => (
                    StatusCode::BAD_REQUEST,
                    "TOKEN_EXPIRED",
                    "Token has expired".to_string(),
                ),
                AuthError::Forbidden => (
                    StatusCode::FORBIDDEN,
                    "FORBIDDEN",
                    "You are not allowed to perform this action.".to_string(),
                ),
                AuthError::StoreUnavailable => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Authentication service temporarily unavailable".to_string(),
                ),
            },

            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Server configuration error".to_string(),
            ),

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = self.classify();
        let response =
            ErrorResponse::new(request_id.to_string(), message, code.to_string(), status.as_u16());
        (status, response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => {
                tracing::warn!(request_id = request_id, error = %self, "Duplicate entry attempt");
            }
            AppError::Database(DatabaseError::NotFound(_)) => {
                tracing::info!(request_id = request_id, error = %self, "Record not found");
            }
            AppError::Database(e) => {
                tracing::error!(request_id = request_id, error = %e, "Database error");
            }
            AppError::Auth(AuthError::StoreUnavailable) => {
                tracing::error!(request_id = request_id, "Revocation store unavailable, request rejected");
            }
            AppError::Auth(AuthError::InvalidCredentials) => {
                tracing::warn!(request_id = request_id, "Invalid credentials attempt");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Authentication error");
            }
            AppError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        self.classify().0
    }
}

// ============================================================================
// ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Per-operation context attached to success and failure logs
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub operation: String,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            operation: operation.into(),
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}
