/// JWT Token Generation and Validation
///
/// [`TokenCodec`] signs and verifies the typed access/refresh tokens with the
/// server secret. It is built once at startup from [`JwtSettings`] and shared.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{Claims, Role, TokenType};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ConfigError};

pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    issuer: String,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

impl TokenCodec {
    /// # Errors
    /// Returns a config error for a non-HMAC algorithm or invalid lifetimes
    pub fn from_settings(config: &JwtSettings) -> Result<Self, ConfigError> {
        config.validate()?;

        let algorithm: Algorithm = config
            .algorithm
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("unknown JWT algorithm {}", config.algorithm)))?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            algorithm,
            issuer: config.issuer.clone(),
            access_lifetime: Duration::seconds(config.access_token_expiry),
            refresh_lifetime: Duration::seconds(config.refresh_token_expiry),
        })
    }

    pub fn access_lifetime(&self) -> Duration {
        self.access_lifetime
    }

    pub fn refresh_lifetime(&self) -> Duration {
        self.refresh_lifetime
    }

    /// Sign a new token issued now.
    ///
    /// # Errors
    /// Returns error if `lifetime` is not positive or signing fails
    pub fn issue(
        &self,
        subject: &str,
        token_type: TokenType,
        lifetime: Duration,
        role: Option<Role>,
    ) -> Result<String, AppError> {
        self.issue_at(subject, token_type, lifetime, role, Utc::now())
    }

    /// Sign a new token as if issued at `now`.
    pub fn issue_at(
        &self,
        subject: &str,
        token_type: TokenType,
        lifetime: Duration,
        role: Option<Role>,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        if lifetime.num_seconds() <= 0 {
            return Err(AppError::Internal(format!(
                "token lifetime must be positive, got {}s",
                lifetime.num_seconds()
            )));
        }

        let claims = Claims::new(subject, token_type, now, lifetime, &self.issuer, role);

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Access token with the configured lifetime, embedding `role`.
    pub fn access_token(&self, subject: &str, role: Role) -> Result<String, AppError> {
        self.issue(subject, TokenType::Access, self.access_lifetime, Some(role))
    }

    /// Refresh token with the configured lifetime.
    pub fn refresh_token(&self, subject: &str) -> Result<String, AppError> {
        self.issue(subject, TokenType::Refresh, self.refresh_lifetime, None)
    }

    /// Verify signature, algorithm, issuer and expiry and return the claims.
    ///
    /// # Errors
    /// `InvalidToken` for every failure, expiry included
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("JWT rejected: expired"),
                    _ => tracing::warn!("JWT validation error: {}", e),
                }
                AuthError::InvalidToken
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            algorithm: "HS256".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        }
    }

    fn codec() -> TokenCodec {
        TokenCodec::from_settings(&get_test_config()).expect("valid test config")
    }

    #[test]
    fn test_issue_and_decode_round_trip() {
        let codec = codec();
        let token = codec
            .issue("u1", TokenType::Access, Duration::minutes(15), Some(Role::User))
            .expect("Failed to generate token");
        let claims = codec.decode(&token).expect("Failed to validate token");

        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.role, Some(Role::User));
        assert_eq!(claims.iss, "test");
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_identical_issuances_differ() {
        let codec = codec();
        let a = codec.refresh_token("u1").unwrap();
        let b = codec.refresh_token("u1").unwrap();

        assert_ne!(a, b);
        assert_ne!(codec.decode(&a).unwrap().jti, codec.decode(&b).unwrap().jti);
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let codec = codec();
        let issued = Utc::now() - Duration::minutes(16);
        let token = codec
            .issue_at("u1", TokenType::Access, Duration::minutes(15), None, issued)
            .unwrap();

        assert_eq!(codec.decode(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_garbage_token() {
        let codec = codec();
        assert_eq!(codec.decode("invalid.token.here"), Err(AuthError::InvalidToken));
        assert_eq!(codec.decode(""), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_tampered_signature() {
        let codec = codec();
        let token = codec.access_token("u1", Role::User).unwrap();

        let tampered = format!("{}X", token);
        assert_eq!(codec.decode(&tampered), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_tampered_payload() {
        let codec = codec();
        let victim = codec.access_token("u1", Role::User).unwrap();
        let forged = codec.access_token("admin-id", Role::Admin).unwrap();

        // keep the victim's header and signature, swap in another payload
        let victim_parts: Vec<&str> = victim.split('.').collect();
        let forged_parts: Vec<&str> = forged.split('.').collect();
        let spliced = format!("{}.{}.{}", victim_parts[0], forged_parts[1], victim_parts[2]);

        assert_eq!(codec.decode(&spliced), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_wrong_secret() {
        let codec = codec();
        let mut other = get_test_config();
        other.secret = "another-secret-key-at-least-32-characters".to_string();
        let other = TokenCodec::from_settings(&other).unwrap();

        let token = other.access_token("u1", Role::User).unwrap();
        assert_eq!(codec.decode(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_wrong_issuer() {
        let mut config = get_test_config();
        let token = codec().access_token("u1", Role::User).unwrap();

        config.issuer = "wrong-issuer".to_string();
        let strict = TokenCodec::from_settings(&config).unwrap();

        assert_eq!(strict.decode(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_missing_required_claims() {
        #[derive(serde::Serialize)]
        struct NoJti {
            sub: String,
            #[serde(rename = "type")]
            token_type: String,
            exp: i64,
            iss: String,
        }

        let config = get_test_config();
        let claims = NoJti {
            sub: "u1".to_string(),
            token_type: "access".to_string(),
            exp: (Utc::now() + Duration::minutes(5)).timestamp(),
            iss: "test".to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(codec().decode(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let config = get_test_config();
        let claims = Claims::new("u1", TokenType::Access, Utc::now(), Duration::minutes(5), "test", None);
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(codec().decode(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_non_positive_lifetime_rejected() {
        let codec = codec();
        assert!(codec.issue("u1", TokenType::Access, Duration::zero(), None).is_err());
        assert!(codec.issue("u1", TokenType::Access, Duration::seconds(-5), None).is_err());
    }

    #[test]
    fn test_default_lifetimes() {
        let codec = codec();
        let access = codec.decode(&codec.access_token("u1", Role::User).unwrap()).unwrap();
        let refresh = codec.decode(&codec.refresh_token("u1").unwrap()).unwrap();

        assert_eq!(access.exp - access.iat, 15 * 60);
        assert_eq!(refresh.exp - refresh.iat, 7 * 24 * 60 * 60);
        assert_eq!(refresh.token_type, TokenType::Refresh);
        assert_eq!(refresh.role, None);
    }
}
