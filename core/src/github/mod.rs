//! GitHub integration module
//!
//! Authenticates webhook deliveries and acknowledges their events.

pub mod webhook;
