//! edge-sts-core: Platform-agnostic core logic for the edge token service
//!
//! This crate contains webhook signature verification, OIDC discovery and
//! JWKS publication, and identity token minting. It depends only on abstract
//! platform traits (Clock, Environment, TokenSigner) and never imports
//! platform-specific code.

pub mod config;
pub mod error;
pub mod github;
pub mod oidc;
pub mod platform;
pub mod sts;

#[cfg(test)]
pub mod test_support;
