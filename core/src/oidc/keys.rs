//! RS256 signing key material
//!
//! Parses the configured RSA private key once, derives its public JWK and key
//! identifier, and signs identity tokens with it.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use once_cell::sync::OnceCell;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256};

use super::claims::IdTokenClaims;
use super::jwks::Jwk;
use crate::error::{ApiError, Result};
use crate::platform::TokenSigner;

const MIN_KEY_BITS: usize = 2048;

/// Parsed signing key with its public JWK
pub struct SigningKeyMaterial {
    encoding_key: EncodingKey,
    jwk: Jwk,
}

impl SigningKeyMaterial {
    /// Parse a PKCS#8 (or PKCS#1) PEM RSA private key.
    ///
    /// The key identifier is `key_id` when given, otherwise the RFC 7638
    /// thumbprint of the public key.
    pub fn from_pem(pem: &str, key_id: Option<&str>) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| ApiError::internal(format!("invalid signing key: {}", e)))?;

        let bits = private_key.size() * 8;
        if bits < MIN_KEY_BITS {
            return Err(ApiError::internal(format!(
                "signing key is {} bits, at least {} required",
                bits, MIN_KEY_BITS
            )));
        }

        let der = private_key
            .to_pkcs1_der()
            .map_err(|e| ApiError::internal(format!("failed to encode signing key: {}", e)))?;
        let encoding_key = EncodingKey::from_rsa_der(der.as_bytes());

        let n = URL_SAFE_NO_PAD.encode(private_key.n().to_bytes_be());
        let e = URL_SAFE_NO_PAD.encode(private_key.e().to_bytes_be());
        let kid = match key_id {
            Some(kid) => kid.to_string(),
            None => jwk_thumbprint(&n, &e),
        };

        Ok(Self {
            encoding_key,
            jwk: Jwk {
                kty: "RSA".to_string(),
                kid,
                key_use: "sig".to_string(),
                alg: "RS256".to_string(),
                n,
                e,
            },
        })
    }

    pub fn key_id(&self) -> &str {
        &self.jwk.kid
    }

    pub fn jwk(&self) -> &Jwk {
        &self.jwk
    }

    /// Sign claims as a compact JWS
    pub fn sign(&self, claims: &IdTokenClaims) -> Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.jwk.kid.clone());

        encode(&header, claims, &self.encoding_key)
            .map_err(|e| ApiError::signing_failed(format!("failed to encode JWT: {}", e)))
    }
}

/// RFC 7638 thumbprint of an RSA public key: base64url(SHA-256(canonical JWK))
pub fn jwk_thumbprint(n: &str, e: &str) -> String {
    // Members in lexicographic order, no whitespace
    let canonical = format!(r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#, e, n);
    URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
}

/// Token signer backed by a PEM private key from configuration.
///
/// The key is parsed on first use and kept for the signer's lifetime. A
/// failed parse is not cached, so a later request retries it.
pub struct PemTokenSigner {
    pem_key: Option<String>,
    key_id: Option<String>,
    material: OnceCell<SigningKeyMaterial>,
}

impl PemTokenSigner {
    pub fn new(pem_key: Option<String>, key_id: Option<String>) -> Self {
        Self {
            pem_key,
            key_id,
            material: OnceCell::new(),
        }
    }

    /// Cached key material, loading it on first call
    pub fn material(&self) -> Result<&SigningKeyMaterial> {
        self.material.get_or_try_init(|| {
            let pem = self
                .pem_key
                .as_deref()
                .ok_or_else(|| ApiError::internal("SIGNING_PRIVATE_KEY secret not set"))?;
            let material = SigningKeyMaterial::from_pem(pem, self.key_id.as_deref())?;
            tracing::info!(kid = %material.key_id(), "loaded signing key");
            Ok(material)
        })
    }
}

#[async_trait]
impl TokenSigner for PemTokenSigner {
    async fn sign(&self, claims: &IdTokenClaims) -> Result<String> {
        self.material()?.sign(claims)
    }

    fn public_jwk(&self) -> Result<Jwk> {
        Ok(self.material()?.jwk().clone())
    }
}
