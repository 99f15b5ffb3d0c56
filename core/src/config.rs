//! Configuration and secrets management

use std::fmt;
use std::time::Duration;

use crate::error::{ApiError, Result};
use crate::oidc::validate_issuer_url;
use crate::platform::Environment;

/// Token lifetime when neither the caller nor `TOKEN_EXPIRATION` sets one (15 minutes)
pub const DEFAULT_TOKEN_EXPIRATION: Duration = Duration::from_secs(15 * 60);

/// Longest lifetime a token may carry unless `MAX_TOKEN_EXPIRATION` says otherwise (24 hours)
pub const DEFAULT_MAX_TOKEN_EXPIRATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Application configuration loaded from environment
#[derive(Clone)]
pub struct Config {
    /// Issuer URL, also the base of the discovery and JWKS documents
    pub issuer_url: String,
    /// RSA signing key (PKCS#8 PEM). Absent keys fail at first use, not at load.
    pub signing_key_pem: Option<String>,
    /// Key identifier override; the JWK thumbprint is used otherwise
    pub key_id: Option<String>,
    /// Audience used when a mint request does not name one
    pub default_audience: Option<String>,
    /// Bearer key required by the mint endpoint. Absent means minting is disabled.
    pub mint_api_key: Option<String>,
    /// Default token lifetime
    pub token_expiration: Duration,
    /// Upper bound on any token lifetime, configured or requested
    pub max_token_expiration: Duration,
    /// Webhook secret for signature verification. Absent means open mode.
    pub webhook_secret: Option<String>,
}

impl Config {
    /// Load configuration from platform environment
    pub fn from_env(env: &dyn Environment) -> Result<Self> {
        let issuer_url = non_empty(env.get_var("ISSUER_URL").ok())
            .ok_or_else(|| ApiError::misconfigured("ISSUER_URL not configured"))?;
        validate_issuer_url(&issuer_url)
            .map_err(|e| ApiError::misconfigured(format!("ISSUER_URL is invalid: {}", e)))?;

        let token_expiration = duration_var(env, "TOKEN_EXPIRATION", DEFAULT_TOKEN_EXPIRATION)?;
        let max_token_expiration =
            duration_var(env, "MAX_TOKEN_EXPIRATION", DEFAULT_MAX_TOKEN_EXPIRATION)?;
        if token_expiration > max_token_expiration {
            return Err(ApiError::misconfigured(format!(
                "TOKEN_EXPIRATION ({}s) exceeds MAX_TOKEN_EXPIRATION ({}s)",
                token_expiration.as_secs(),
                max_token_expiration.as_secs()
            )));
        }

        Ok(Self {
            issuer_url: issuer_url.trim_end_matches('/').to_string(),
            signing_key_pem: non_empty(env.get_secret("SIGNING_PRIVATE_KEY").ok()),
            key_id: non_empty(env.get_var("KEY_ID").ok()),
            default_audience: non_empty(env.get_var("ALLOWED_AUDIENCE").ok()),
            mint_api_key: non_empty(env.get_secret("MINT_API_KEY").ok()),
            token_expiration,
            max_token_expiration,
            webhook_secret: non_empty(env.get_secret("GITHUB_WEBHOOK_SECRET").ok()),
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("issuer_url", &self.issuer_url)
            .field("signing_key_pem", &redacted(&self.signing_key_pem))
            .field("key_id", &self.key_id)
            .field("default_audience", &self.default_audience)
            .field("mint_api_key", &redacted(&self.mint_api_key))
            .field("token_expiration", &self.token_expiration)
            .field("max_token_expiration", &self.max_token_expiration)
            .field("webhook_secret", &redacted(&self.webhook_secret))
            .finish()
    }
}

fn redacted(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "[REDACTED]")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn duration_var(env: &dyn Environment, name: &str, default: Duration) -> Result<Duration> {
    match non_empty(env.get_var(name).ok()) {
        Some(value) => parse_expiration(&value).ok_or_else(|| {
            ApiError::misconfigured(format!("{} '{}' is not a valid duration", name, value))
        }),
        None => Ok(default),
    }
}

/// Parse a token lifetime such as `900`, `15m`, `1h 30m` or `2days`.
///
/// Bare integers are seconds; anything else goes through `humantime`.
/// Sub-second remainders are truncated and lifetimes under one second are rejected.
pub fn parse_expiration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let lifetime = if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        Duration::from_secs(value.parse().ok()?)
    } else {
        humantime::parse_duration(value).ok()?
    };

    match lifetime.as_secs() {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    }
}
