//! Token minting endpoint implementation
//!
//! Issues short-lived RS256 identity tokens to callers holding the mint API key.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use subtle::ConstantTimeEq;

use crate::config::{parse_expiration, Config};
use crate::error::{ApiError, Result};
use crate::oidc::IdTokenClaims;
use crate::platform::{Clock, TokenSigner};

/// Mint response
#[derive(Debug, Serialize, Deserialize)]
pub struct MintResponse {
    pub id_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Platform-neutral mint request
pub struct MintRequest {
    /// Raw `Authorization` header value
    pub authorization: Option<String>,
    /// Raw request body
    pub body: Vec<u8>,
}

#[derive(Deserialize)]
struct MintBody {
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    audience: Option<String>,
    #[serde(default)]
    claims: Option<Value>,
    #[serde(default)]
    expiration: Option<String>,
}

/// Handle token mint request
#[tracing::instrument(skip_all)]
pub async fn handle(
    request: MintRequest,
    config: &Config,
    signer: &dyn TokenSigner,
    clock: &dyn Clock,
) -> Result<MintResponse> {
    // 1. Authenticate the caller against the configured API key
    authorize(request.authorization.as_deref(), config.mint_api_key.as_deref())?;

    // 2. Parse body
    let body = parse_body(&request.body)?;

    // 3. Subject
    let subject = body
        .subject
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::invalid_request("subject is required"))?;

    // 4. Audience, falling back to the configured default
    let audience = body
        .audience
        .filter(|a| !a.trim().is_empty())
        .or_else(|| config.default_audience.clone())
        .ok_or_else(|| ApiError::invalid_request("audience is required"))?;

    // 5. Caller claims, taken as given
    let custom_claims = match body.claims {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(claims)) => claims,
        Some(_) => return Err(ApiError::invalid_request("claims must be a JSON object")),
    };

    // 6. Lifetime
    let lifetime = match body.expiration.as_deref() {
        Some(value) => parse_expiration(value)
            .ok_or_else(|| ApiError::invalid_request(format!("invalid expiration '{}'", value)))?,
        None => config.token_expiration,
    };
    if lifetime > config.max_token_expiration {
        return Err(ApiError::invalid_request(format!(
            "expiration exceeds the maximum of {}s",
            config.max_token_expiration.as_secs()
        )));
    }
    let expires_in = lifetime.as_secs();

    let iat = clock.now_secs();
    let exp = iat
        .checked_add(expires_in)
        .ok_or_else(|| ApiError::invalid_request("expiration is too large"))?;

    let claims = IdTokenClaims::new(&config.issuer_url, &subject, &audience, iat, exp, custom_claims);

    // 7. Sign; internal detail stays in the logs
    let id_token = signer.sign(&claims).await.map_err(|e| {
        tracing::error!(error = %e, "token signing failed");
        ApiError::signing_failed("token signing failed")
    })?;

    tracing::info!(subject = %subject, audience = %audience, expires_in, "minted identity token");

    Ok(MintResponse {
        id_token,
        token_type: "Bearer".to_string(),
        expires_in,
    })
}

/// Check the `Authorization: Bearer <key>` header against the configured key.
///
/// A missing configured key disables minting outright, whatever the caller sent.
fn authorize(authorization: Option<&str>, api_key: Option<&str>) -> Result<()> {
    let Some(api_key) = api_key else {
        tracing::error!("MINT_API_KEY is not configured; refusing to mint");
        return Err(ApiError::misconfigured("token minting is not configured"));
    };

    let header = authorization.ok_or_else(|| ApiError::unauthorized("missing Authorization header"))?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or_else(|| ApiError::unauthorized("Authorization header must use Bearer scheme"))?;

    if !bool::from(token.as_bytes().ct_eq(api_key.as_bytes())) {
        tracing::warn!("mint request with invalid API key");
        return Err(ApiError::unauthorized("invalid API key"));
    }

    Ok(())
}

fn parse_body(body: &[u8]) -> Result<MintBody> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ApiError::invalid_request("request body must be valid JSON"))?;

    if !value.is_object() {
        return Err(ApiError::invalid_request("request body must be a JSON object"));
    }

    serde_json::from_value(value).map_err(|_| {
        ApiError::invalid_request("subject, audience and expiration must be strings")
    })
}
