/// Middleware module
///
/// Custom middleware for token authentication.

mod token_gate;

pub use token_gate::TokenGate;
