//! Platform abstraction traits
//!
//! These traits define the boundary between platform-agnostic core logic and
//! platform-specific implementations (Cloud Run, Cloud Functions, tests).

use async_trait::async_trait;

use crate::error::Result;
use crate::oidc::{IdTokenClaims, Jwk};

/// Clock for current time (enables testing with deterministic timestamps)
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> u64;
}

/// Environment/secrets access
pub trait Environment: Send + Sync {
    fn get_var(&self, name: &str) -> Result<String>;
    fn get_secret(&self, name: &str) -> Result<String>;
}

/// Signs identity tokens and publishes the matching public key.
///
/// Implementations own the private key; only the public JWK ever leaves them.
#[async_trait]
pub trait TokenSigner: Send + Sync {
    /// Sign `claims` as a compact RS256 JWS carrying the key identifier.
    async fn sign(&self, claims: &IdTokenClaims) -> Result<String>;

    /// Public half of the signing key as a JWK.
    fn public_jwk(&self) -> Result<Jwk>;
}
