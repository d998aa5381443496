/// Authentication module
///
/// Password hashing, token issuance and verification, the revocation
/// denylist, the request gate and the session workflows built on them.

mod claims;
mod gate;
mod jwt;
mod password;
mod revocation;
mod session;

pub use claims::{Claims, Role, TokenType};
pub use gate::{bearer_token, require_role, AuthGate};
pub use jwt::TokenCodec;
pub use password::{validate_password_strength, CredentialHasher};
pub use revocation::{
    InMemoryRevocationStore, RedisRevocationStore, RevocationError, RevocationStore,
    DEFAULT_REVOCATION_TTL_SECS,
};
pub use session::{LoginOutcome, SessionService, SignupData};
