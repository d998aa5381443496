/// Request-time token verification
///
/// One routine serves both token types; the required [`TokenType`] is a
/// parameter. Role checks are a separate step on the authenticated account.

use std::sync::Arc;

use crate::auth::claims::{Claims, Role, TokenType};
use crate::auth::jwt::TokenCodec;
use crate::auth::revocation::RevocationStore;
use crate::error::AuthError;

#[derive(Clone)]
pub struct AuthGate {
    codec: Arc<TokenCodec>,
    revocations: Arc<dyn RevocationStore>,
}

impl AuthGate {
    pub fn new(codec: Arc<TokenCodec>, revocations: Arc<dyn RevocationStore>) -> Self {
        Self { codec, revocations }
    }

    /// Verify the `Authorization` header value for a token of `required` type.
    ///
    /// Steps, first failure wins: bearer present, token decodes, `jti`
    /// present, `jti` not revoked, type matches.
    pub async fn verify(&self, authorization: Option<&str>, required: TokenType) -> Result<Claims, AuthError> {
        let token = bearer_token(authorization).ok_or_else(|| {
            tracing::debug!("Missing or non-bearer Authorization header");
            AuthError::MissingToken
        })?;

        let claims = self.codec.decode(token)?;

        if claims.jti.trim().is_empty() {
            tracing::warn!(user_id = %claims.sub, "Token without jti presented");
            return Err(AuthError::MalformedToken);
        }

        let revoked = self.revocations.is_revoked(&claims.jti).await.map_err(|e| {
            tracing::error!(jti = %claims.jti, error = %e, "Revocation check failed, rejecting");
            AuthError::StoreUnavailable
        })?;
        if revoked {
            tracing::warn!(user_id = %claims.sub, jti = %claims.jti, "Revoked token presented");
            return Err(AuthError::RevokedToken);
        }

        if claims.token_type != required {
            tracing::warn!(
                user_id = %claims.sub,
                presented = %claims.token_type,
                required = %required,
                "Wrong token type presented"
            );
            return Err(AuthError::WrongTokenType(required));
        }

        Ok(claims)
    }
}

/// Token part of `Bearer <token>`, if any.
pub fn bearer_token(authorization: Option<&str>) -> Option<&str> {
    let value = authorization?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Role gate: accept only roles in `allowed`.
pub fn require_role(role: Role, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        tracing::warn!(role = %role, "Role not permitted");
        Err(AuthError::Forbidden)
    }
}
