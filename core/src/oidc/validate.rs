//! Identity token validation
//!
//! Verifies tokens issued by this service against its JWKS, the way a relying
//! party would.

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

use super::claims::IdTokenClaims;
use super::jwks::JwkSet;
use crate::error::{ApiError, Result};
use crate::platform::Clock;

/// Allowed clock skew for `iat`
const IAT_SKEW_SECS: u64 = 60;

/// Validate a token against a key set and return its claims
pub fn validate_token(
    token: &str,
    jwks: &JwkSet,
    issuer: &str,
    audience: &str,
    clock: &dyn Clock,
) -> Result<IdTokenClaims> {
    // Decode header to get key ID and algorithm
    let header = decode_header(token)
        .map_err(|e| ApiError::invalid_token(format!("invalid JWT header: {}", e)))?;

    if header.alg != Algorithm::RS256 {
        return Err(ApiError::invalid_token(format!(
            "unsupported algorithm {:?}",
            header.alg
        )));
    }

    // Find the key
    let kid = header
        .kid
        .as_ref()
        .ok_or_else(|| ApiError::invalid_token("JWT missing 'kid' header"))?;

    let jwk = jwks
        .find(kid)
        .ok_or_else(|| ApiError::token_verification_failed(format!("key '{}' not found in JWKS", kid)))?;

    let decoding_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
        .map_err(|e| ApiError::token_verification_failed(format!("invalid JWK: {}", e)))?;

    // Time-based claims are checked below against the injected clock
    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.set_issuer(&[issuer]);
    validation.set_audience(&[audience]);

    let token_data = decode::<IdTokenClaims>(token, &decoding_key, &validation)
        .map_err(|e| ApiError::token_verification_failed(format!("token verification failed: {}", e)))?;
    let claims = token_data.claims;

    let now_secs = clock.now_secs();

    if claims.exp <= now_secs {
        return Err(ApiError::invalid_token("token has expired"));
    }

    if let Some(nbf) = claims.nbf {
        if nbf > now_secs + IAT_SKEW_SECS {
            return Err(ApiError::invalid_token("token is not yet valid (nbf claim)"));
        }
    }

    if claims.iat > now_secs + IAT_SKEW_SECS {
        return Err(ApiError::invalid_token("token issued in the future (iat claim)"));
    }

    if claims.iat >= claims.exp {
        return Err(ApiError::invalid_token("invalid token: iat >= exp"));
    }

    Ok(claims)
}
