use crate::error::ConfigError;

/// Shortest accepted HMAC signing secret, in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    pub redis: RedisSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// JWT authentication settings
#[derive(serde::Deserialize, Clone, Debug)]
pub struct JwtSettings {
    pub secret: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,   // seconds (900 = 15 minutes)
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: i64,  // seconds (604800 = 7 days)
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

/// Revocation store (Redis) settings
#[derive(serde::Deserialize, Clone, Debug)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    /// Seconds a revocation entry lives before it is purged
    #[serde(default = "default_revocation_ttl")]
    pub revocation_ttl: u64,
    /// Per-call timeout for revocation lookups and writes
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl RedisSettings {
    pub fn url(&self) -> String {
        format!("redis://{}:{}/0", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_access_token_expiry() -> i64 {
    15 * 60
}

fn default_refresh_token_expiry() -> i64 {
    7 * 24 * 60 * 60
}

fn default_issuer() -> String {
    "auth-service".to_string()
}

fn default_revocation_ttl() -> u64 {
    crate::auth::DEFAULT_REVOCATION_TTL_SECS
}

fn default_timeout_ms() -> u64 {
    500
}

impl Settings {
    /// Reject settings the token subsystem cannot run safely with.
    ///
    /// A revocation entry must outlive every token it could block, so the
    /// revocation TTL may not be shorter than the longest token lifetime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.jwt.validate()?;

        if !(4..=31).contains(&self.application.bcrypt_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "application.bcrypt_cost must be between 4 and 31, got {}",
                self.application.bcrypt_cost
            )));
        }

        let longest = self.jwt.access_token_expiry.max(self.jwt.refresh_token_expiry);
        if (self.redis.revocation_ttl as i64) < longest {
            return Err(ConfigError::InvalidValue(format!(
                "redis.revocation_ttl ({}s) is shorter than the longest token lifetime ({}s)",
                self.redis.revocation_ttl, longest
            )));
        }

        if self.redis.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("redis.timeout_ms must be positive".to_string()));
        }

        Ok(())
    }
}

impl JwtSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::MissingRequired("jwt.secret".to_string()));
        }
        if self.secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::InvalidValue(format!(
                "jwt.secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }
        if !matches!(self.algorithm.as_str(), "HS256" | "HS384" | "HS512") {
            return Err(ConfigError::InvalidValue(format!(
                "jwt.algorithm must be an HMAC algorithm, got {}",
                self.algorithm
            )));
        }
        if self.access_token_expiry <= 0 || self.refresh_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "token lifetimes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load `configuration.yaml` (optional), then `APP_*` environment overrides,
/// e.g. `APP_JWT__SECRET`.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
