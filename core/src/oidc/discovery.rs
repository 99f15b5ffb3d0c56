//! OIDC Discovery document
//!
//! Publishes the OpenID Connect discovery metadata relying parties use to
//! locate the JWKS and learn what this issuer signs.

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// Path of the JWKS document relative to the issuer
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// OIDC Discovery document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub jwks_uri: String,
    pub response_types_supported: Vec<String>,
    pub subject_types_supported: Vec<String>,
    pub id_token_signing_alg_values_supported: Vec<String>,
    pub claims_supported: Vec<String>,
}

/// Build the discovery document for an issuer
pub fn discovery_document(issuer: &str) -> DiscoveryDocument {
    let issuer = issuer.trim_end_matches('/');

    DiscoveryDocument {
        issuer: issuer.to_string(),
        jwks_uri: format!("{}{}", issuer, JWKS_PATH),
        response_types_supported: vec!["id_token".to_string()],
        subject_types_supported: vec!["public".to_string()],
        id_token_signing_alg_values_supported: vec!["RS256".to_string()],
        claims_supported: ["sub", "iss", "aud", "exp", "iat"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
    }
}

/// Validate issuer URL format per RFC 8414 and OpenID Connect Core 1.0
pub(crate) fn validate_issuer_url(issuer: &str) -> Result<()> {
    let url = url::Url::parse(issuer)
        .map_err(|_| ApiError::invalid_request("invalid issuer URL"))?;

    let is_localhost = matches!(url.host_str(), Some("localhost") | Some("127.0.0.1") | Some("[::1]"));
    if url.scheme() != "https" && !is_localhost {
        return Err(ApiError::invalid_request("issuer must use HTTPS"));
    }

    if url.query().is_some() {
        return Err(ApiError::invalid_request("issuer URL must not have query string"));
    }

    if url.fragment().is_some() {
        return Err(ApiError::invalid_request("issuer URL must not have fragment"));
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(ApiError::invalid_request("issuer URL must not have userinfo"));
    }

    match url.host_str() {
        Some(host) if host.is_ascii() => Ok(()),
        Some(_) => Err(ApiError::invalid_request(
            "issuer hostname contains non-ASCII characters",
        )),
        None => Err(ApiError::invalid_request("issuer URL must have a host")),
    }
}
