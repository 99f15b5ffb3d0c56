//! OIDC (OpenID Connect) issuer module
//!
//! Publishes discovery metadata and the JWKS, holds the RS256 signing key, and
//! verifies issued tokens on behalf of relying parties.

mod claims;
mod discovery;
mod jwks;
mod keys;
mod validate;

pub use claims::{IdTokenClaims, REGISTERED_CLAIMS};
pub use discovery::{discovery_document, DiscoveryDocument};
pub(crate) use discovery::validate_issuer_url;
pub use jwks::{jwks_document, Jwk, JwkSet};
pub use keys::{jwk_thumbprint, PemTokenSigner, SigningKeyMaterial};
pub use validate::validate_token;
