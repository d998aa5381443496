use std::net::TcpListener;
use std::sync::Arc;

use bookly::auth::{AuthGate, CredentialHasher, RedisRevocationStore, RevocationStore, SessionService, TokenCodec};
use bookly::books::PgBookRepository;
use bookly::configuration::get_configuration;
use bookly::startup::run;
use bookly::telemetry::init_telemetry;
use bookly::users::PgUserRepository;
use sqlx::postgres::PgPoolOptions;

fn startup_error(kind: std::io::ErrorKind, message: &'static str) -> std::io::Error {
    std::io::Error::new(kind, message)
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(startup_error(std::io::ErrorKind::InvalidInput, "Configuration error"));
        }
    };
    if let Err(e) = configuration.validate() {
        tracing::error!("Invalid configuration: {}", e);
        return Err(startup_error(std::io::ErrorKind::InvalidInput, "Configuration error"));
    }
    tracing::info!("Configuration loaded successfully");

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            startup_error(std::io::ErrorKind::ConnectionRefused, "Database connection error")
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run migrations: {}", e);
        startup_error(std::io::ErrorKind::Other, "Database migration error")
    })?;
    tracing::info!("Database ready");

    let revocations: Arc<dyn RevocationStore> = Arc::new(
        RedisRevocationStore::connect(&configuration.redis)
            .await
            .map_err(|e| {
                tracing::error!("Failed to connect to revocation store: {}", e);
                startup_error(std::io::ErrorKind::ConnectionRefused, "Redis connection error")
            })?,
    );
    tracing::info!(
        ttl = configuration.redis.revocation_ttl,
        "Revocation store connected"
    );

    let codec = Arc::new(TokenCodec::from_settings(&configuration.jwt).map_err(|e| {
        tracing::error!("Invalid JWT settings: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "JWT configuration error")
    })?);

    let session = SessionService::new(
        Arc::new(PgUserRepository::new(pool.clone())),
        codec.clone(),
        revocations.clone(),
        CredentialHasher::new(configuration.application.bcrypt_cost),
    )
    .map_err(|e| {
        tracing::error!("Failed to build session service: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Password hashing configuration error")
    })?;
    let gate = AuthGate::new(codec, revocations);
    let books = Arc::new(PgBookRepository::new(pool));

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, session, gate, books)?.await
}
