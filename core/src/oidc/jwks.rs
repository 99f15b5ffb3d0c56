//! JWKS (JSON Web Key Set) publication

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::platform::TokenSigner;

/// Public RSA signing key as a JSON Web Key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub kid: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub alg: String,
    /// Modulus (base64url, no padding)
    pub n: String,
    /// Public exponent (base64url, no padding)
    pub e: String,
}

/// JSON Web Key Set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Find the key with the given key identifier
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

/// Build the JWKS served to relying parties.
///
/// Any failure loading the key collapses to a generic internal error; the
/// underlying cause is logged, not returned.
#[tracing::instrument(skip_all)]
pub fn jwks_document(signer: &dyn TokenSigner) -> Result<JwkSet> {
    let jwk = signer.public_jwk().map_err(|e| {
        tracing::error!(error = %e, "failed to load public signing key");
        ApiError::internal("JWKS unavailable")
    })?;

    Ok(JwkSet { keys: vec![jwk] })
}
