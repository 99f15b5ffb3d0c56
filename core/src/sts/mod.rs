//! Security Token Service module
//!
//! Implements the token minting endpoint.

pub mod mint;
