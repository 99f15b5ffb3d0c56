//! Mock implementations of platform traits for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::oidc::{IdTokenClaims, Jwk};
use crate::platform::{Clock, Environment, TokenSigner};

/// 2048-bit RSA key in PKCS#8 PEM form
pub const TEST_SIGNING_KEY: &str = include_str!("../testdata/signing_key.pem");

/// A second, unrelated 2048-bit RSA key
pub const OTHER_SIGNING_KEY: &str = include_str!("../testdata/other_signing_key.pem");

pub const TEST_ISSUER: &str = "https://sts.example.com";

pub const TEST_TIMESTAMP: u64 = 1_790_000_000;

/// Mock clock with a fixed timestamp
pub struct MockClock(pub u64);

impl Clock for MockClock {
    fn now_secs(&self) -> u64 {
        self.0
    }
}

/// Mock environment backed by an in-memory HashMap
pub struct MockEnv {
    vars: HashMap<String, String>,
    secrets: HashMap<String, String>,
}

impl MockEnv {
    pub fn new(vars: HashMap<String, String>, secrets: HashMap<String, String>) -> Self {
        Self { vars, secrets }
    }

    pub fn builder() -> MockEnvBuilder {
        MockEnvBuilder::default()
    }
}

impl Environment for MockEnv {
    fn get_var(&self, name: &str) -> Result<String> {
        self.vars
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::internal(format!("variable '{}' not found", name)))
    }

    fn get_secret(&self, name: &str) -> Result<String> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::internal(format!("secret '{}' not found", name)))
    }
}

#[derive(Default)]
pub struct MockEnvBuilder {
    vars: HashMap<String, String>,
    secrets: HashMap<String, String>,
}

impl MockEnvBuilder {
    pub fn var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn secret(mut self, name: &str, value: &str) -> Self {
        self.secrets.insert(name.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> MockEnv {
        MockEnv::new(self.vars, self.secrets)
    }
}

/// Fully populated configuration around the test key
pub fn test_config() -> Config {
    Config {
        issuer_url: TEST_ISSUER.to_string(),
        signing_key_pem: Some(TEST_SIGNING_KEY.to_string()),
        key_id: None,
        default_audience: None,
        mint_api_key: Some("correct-key".to_string()),
        token_expiration: Duration::from_secs(900),
        max_token_expiration: Duration::from_secs(24 * 3600),
        webhook_secret: Some("shh".to_string()),
    }
}

/// Signer whose every operation fails with internal detail
pub struct FailingSigner;

#[async_trait]
impl TokenSigner for FailingSigner {
    async fn sign(&self, _claims: &IdTokenClaims) -> Result<String> {
        Err(ApiError::internal("RSA private key rejected: invalid modulus"))
    }

    fn public_jwk(&self) -> Result<Jwk> {
        Err(ApiError::internal("RSA private key rejected: invalid modulus"))
    }
}
